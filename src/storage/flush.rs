//! Flush engine - drains staged rows into the store in flush order
//!
//! One cycle walks the registry's flush order once. Rows of
//! identity-assigning parents are inserted one at a time so the identifier
//! the store hands out can be recorded against the row's placeholder; every
//! queue flushed later in the same cycle has its placeholders substituted
//! before binding. Transaction and savepoint handling live in
//! [`Database::flush`](crate::Database::flush); this module only runs the
//! inserts and classifies what goes wrong.

use super::classify::Violation;
use super::stager::{PendingRow, Stager};
use crate::schema::{InsertMode, SchemaRegistry, TableSchema};
use crate::value::{TempId, Value};
use crate::{Error, Result};
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Rows included in a failure's forensic dump
const FORENSIC_ROWS: usize = 5;

/// Where the engine is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushState {
    /// Nothing staged since the store was opened or cleared
    Idle,
    /// Rows are accumulating
    Staging,
    /// The last cycle committed and nothing has been staged since
    Committed,
    /// The last cycle failed; staging and flushing are refused until the
    /// queues are cleared or the transaction is rolled back
    Failed,
}

/// What one committed cycle wrote
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlushStats {
    /// Rows per table, in flush order
    pub tables: Vec<(String, usize)>,
    pub placeholders_resolved: usize,
}

impl FlushStats {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }

    pub fn rows_for(&self, table: &str) -> usize {
        self.tables
            .iter()
            .find(|(name, _)| name == table)
            .map_or(0, |(_, n)| *n)
    }
}

/// Forensic payload carried by every flush error
#[derive(Debug, Clone)]
pub struct FlushFailure {
    pub table: String,
    pub mode: InsertMode,
    pub statement: String,
    /// Rows that were queued for the table when the cycle aborted
    pub pending: usize,
    /// The first few of them
    pub sample: Vec<Vec<Value>>,
    pub cause: String,
    pub hint: Option<&'static str>,
}

impl FlushFailure {
    fn new(table: &str, mode: InsertMode, statement: &str, rows: &[PendingRow], cause: String) -> Self {
        Self {
            table: table.to_string(),
            mode,
            statement: statement.to_string(),
            pending: rows.len(),
            sample: rows.iter().take(FORENSIC_ROWS).map(|r| r.values.clone()).collect(),
            cause,
            hint: None,
        }
    }
}

impl fmt::Display for FlushFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} into {}: {}", self.mode, self.table, self.cause)?;
        writeln!(f, "  statement: {}", self.statement)?;
        writeln!(
            f,
            "  first {} of {} pending rows:",
            self.sample.len(),
            self.pending
        )?;
        for row in &self.sample {
            let fields: Vec<String> = row.iter().map(ToString::to_string).collect();
            writeln!(f, "    ({})", fields.join(", "))?;
        }
        if let Some(hint) = self.hint {
            write!(f, "  hint: {hint}")?;
        }
        Ok(())
    }
}

/// Placeholder → store-assigned identifier, valid for one cycle
#[derive(Debug, Default)]
pub struct TempIdMap {
    ids: HashMap<TempId, i64>,
}

impl TempIdMap {
    pub fn record(&mut self, placeholder: TempId, id: i64) {
        self.ids.insert(placeholder, id);
    }

    pub fn get(&self, placeholder: TempId) -> Option<i64> {
        self.ids.get(&placeholder).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Substitute every placeholder field; committed fields pass through.
    /// Returns the first placeholder with no recorded identifier.
    pub fn resolve(&self, values: &[Value]) -> std::result::Result<Vec<Value>, TempId> {
        values
            .iter()
            .map(|v| match v.placeholder() {
                Some(t) => self.get(t).map(Value::Integer).ok_or(t),
                None => Ok(v.clone()),
            })
            .collect()
    }
}

/// Run one cycle against `conn`. The caller owns the surrounding
/// transaction and clears the stager on success.
pub fn run_cycle(conn: &Connection, registry: &SchemaRegistry, stager: &Stager) -> Result<FlushStats> {
    let unflushable: Vec<String> = stager
        .tables()
        .into_iter()
        .filter(|t| registry.flush_position(t).is_none())
        .map(|t| {
            format!(
                "Table '{t}' has {} pending rows but is not in the flush order",
                stager.rows(t).len()
            )
        })
        .collect();
    if !unflushable.is_empty() {
        return Err(Error::SchemaContract(unflushable));
    }

    let mut stats = FlushStats::default();
    let mut ids = TempIdMap::default();

    for entry in registry.flush_order() {
        let rows = stager.rows(&entry.table);
        if rows.is_empty() {
            continue;
        }
        let Some(schema) = registry.get(&entry.table) else {
            return Err(Error::contract(format!(
                "Flush order names unknown table '{}'",
                entry.table
            )));
        };

        let written = flush_table(conn, schema, entry.mode, rows, &mut ids)?;
        tracing::debug!(table = %entry.table, rows = written, mode = %entry.mode, "flushed table");
        stats.tables.push((entry.table.clone(), written));
    }

    stats.placeholders_resolved = ids.len();
    Ok(stats)
}

fn flush_table(
    conn: &Connection,
    schema: &TableSchema,
    mode: InsertMode,
    rows: &[PendingRow],
    ids: &mut TempIdMap,
) -> Result<usize> {
    let arity = row_arity(schema, rows)?;
    let sql = insert_sql(schema, mode, arity);

    let mut stmt = conn
        .prepare_cached(&sql)
        .map_err(|e| failure(Violation::of(&e), schema, mode, &sql, rows, e.to_string()))?;

    for row in rows {
        let values = ids.resolve(&row.values).map_err(|t| {
            failure(
                Violation::Orphan,
                schema,
                mode,
                &sql,
                rows,
                format!("placeholder {t} has no recorded identifier in this cycle"),
            )
        })?;

        stmt.execute(params_from_iter(values.iter()))
            .map_err(|e| failure(Violation::of(&e), schema, mode, &sql, rows, e.to_string()))?;

        if let Some(placeholder) = row.placeholder {
            ids.record(placeholder, conn.last_insert_rowid());
        }
    }

    Ok(rows.len())
}

fn failure(
    violation: Violation,
    schema: &TableSchema,
    mode: InsertMode,
    sql: &str,
    rows: &[PendingRow],
    cause: String,
) -> Error {
    let mut failure = FlushFailure::new(&schema.name, mode, sql, rows, cause);
    failure.hint = violation.hint();
    tracing::error!(table = %schema.name, pending = rows.len(), cause = %failure.cause, "flush failed");
    violation.into_error(failure)
}

/// Every row in a queue supplies the same prefix of the insertable columns
fn row_arity(schema: &TableSchema, rows: &[PendingRow]) -> Result<usize> {
    let insertable = schema.insertable_columns().len();
    let arity = rows.first().map_or(0, |r| r.values.len());

    if arity == 0 || arity > insertable {
        return Err(Error::RowShape {
            table: schema.name.clone(),
            detail: format!("row has {arity} fields, table takes 1 to {insertable}"),
        });
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.values.len() != arity) {
        return Err(Error::RowShape {
            table: schema.name.clone(),
            detail: format!(
                "row {i} has {} fields but the queue's first row has {arity}",
                row.values.len()
            ),
        });
    }
    Ok(arity)
}

/// `MODE INTO table (c1, c2) VALUES (?1, ?2)` for the first `arity` insertable columns
pub fn insert_sql(schema: &TableSchema, mode: InsertMode, arity: usize) -> String {
    let columns: Vec<&str> = schema
        .insertable_columns()
        .into_iter()
        .take(arity)
        .map(|c| c.name.as_str())
        .collect();
    let params: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "{} INTO {} ({}) VALUES ({})",
        mode.as_sql(),
        schema.name,
        columns.join(", "),
        params.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use crate::schema::Column;

    fn blocks() -> TableSchema {
        TableSchema::new("cfg_blocks")
            .column(Column::identity("id"))
            .column(Column::text("file").not_null())
            .column(Column::text("function_name"))
            .assigns_identities()
    }

    fn pending(values: Vec<Value>) -> PendingRow {
        PendingRow {
            placeholder: None,
            values,
        }
    }

    #[test]
    fn test_insert_sql_skips_identity_and_takes_prefix() {
        assert_eq!(
            insert_sql(&blocks(), InsertMode::Insert, 1),
            "INSERT INTO cfg_blocks (file) VALUES (?1)"
        );
        assert_eq!(
            insert_sql(&blocks(), InsertMode::InsertOrIgnore, 2),
            "INSERT OR IGNORE INTO cfg_blocks (file, function_name) VALUES (?1, ?2)"
        );
    }

    #[test]
    fn test_row_arity() {
        let table = blocks();
        assert_eq!(row_arity(&table, &[pending(row!["a.py", "f"])]).unwrap(), 2);
        assert!(matches!(
            row_arity(&table, &[pending(row!["a.py", "f", "extra"])]),
            Err(Error::RowShape { .. })
        ));
        assert!(matches!(row_arity(&table, &[pending(row![])]), Err(Error::RowShape { .. })));
        assert!(matches!(
            row_arity(&table, &[pending(row!["a.py"]), pending(row!["b.py", "g"])]),
            Err(Error::RowShape { .. })
        ));
    }

    #[test]
    fn test_temp_id_map_resolves_only_placeholders() {
        let mut ids = TempIdMap::default();
        let tmp = TempId::new(-5).unwrap();
        ids.record(tmp, 42);

        let row = row!["a.py", tmp, crate::RowRef::Committed(7), -5];
        assert_eq!(
            ids.resolve(&row).unwrap(),
            vec![
                Value::Text("a.py".into()),
                Value::Integer(42),
                Value::Ref(crate::RowRef::Committed(7)),
                Value::Integer(-5),
            ]
        );

        let missing = TempId::new(-9).unwrap();
        assert_eq!(ids.resolve(&row![missing]), Err(missing));
    }

    #[test]
    fn test_failure_dump_lists_first_rows() {
        let rows: Vec<PendingRow> = (0..8).map(|i| pending(row!["a.py", i])).collect();
        let mut failure = FlushFailure::new(
            "refs",
            InsertMode::Insert,
            "INSERT INTO refs (src, line) VALUES (?1, ?2)",
            &rows,
            "UNIQUE constraint failed".into(),
        );
        failure.hint = Violation::Duplicate.hint();
        let dump = failure.to_string();
        assert!(dump.starts_with("INSERT into refs: UNIQUE constraint failed"));
        assert!(dump.contains("first 5 of 8 pending rows"));
        assert!(dump.contains("(a.py, 4)"));
        assert!(!dump.contains("(a.py, 5)"));
        assert!(dump.contains("hint: the producer staged the same key twice"));
    }
}

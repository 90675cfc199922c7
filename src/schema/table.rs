//! Table, foreign key and view definitions

use super::column::Column;
use super::registry::SchemaRegistry;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;

/// Foreign key relationship.
///
/// Emitted as a `FOREIGN KEY` clause in the generated DDL, so the store
/// enforces it at flush time, and used by the query builder to infer join
/// predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub local_columns: Vec<String>,
    pub foreign_table: String,
    pub foreign_columns: Vec<String>,
}

impl ForeignKey {
    pub fn new(local_columns: &[&str], foreign_table: &str, foreign_columns: &[&str]) -> Self {
        Self {
            local_columns: local_columns.iter().map(|c| c.to_string()).collect(),
            foreign_table: foreign_table.to_string(),
            foreign_columns: foreign_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Column pairs as `(foreign, local)`, the order a join from the parent reads them
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.foreign_columns
            .iter()
            .map(String::as_str)
            .zip(self.local_columns.iter().map(String::as_str))
    }

    /// Validate against the whole registry.
    ///
    /// Returns every problem found instead of stopping at the first one.
    pub fn validate(&self, local: &TableSchema, registry: &SchemaRegistry) -> Vec<String> {
        let mut errors = Vec::new();

        let Some(foreign) = registry.get(&self.foreign_table) else {
            errors.push(format!(
                "Foreign key on '{}' references table '{}' which does not exist",
                local.name, self.foreign_table
            ));
            return errors;
        };

        for col in &self.local_columns {
            if !local.has_column(col) {
                errors.push(format!("Local column '{col}' not found in table '{}'", local.name));
            }
        }

        for col in &self.foreign_columns {
            if !foreign.has_column(col) {
                errors.push(format!(
                    "Foreign column '{col}' not found in table '{}'",
                    self.foreign_table
                ));
            }
        }

        if self.local_columns.len() != self.foreign_columns.len() {
            errors.push(format!(
                "Foreign key on '{}' -> '{}': column count mismatch: {} local vs {} foreign",
                local.name,
                self.foreign_table,
                self.local_columns.len(),
                self.foreign_columns.len()
            ));
        }

        if errors.is_empty() && !foreign.is_unique_key(&self.foreign_columns) {
            errors.push(format!(
                "Foreign key on '{}' -> '{}'({}) does not target the primary key or a UNIQUE group",
                local.name,
                self.foreign_table,
                self.foreign_columns.join(", ")
            ));
        }

        errors
    }

    fn to_sql(&self) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            self.local_columns.join(", "),
            self.foreign_table,
            self.foreign_columns.join(", ")
        )
    }
}

/// Secondary index, optionally partial
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub name: String,
    pub columns: Vec<String>,
    pub predicate: Option<String>,
}

/// A complete table definition
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    /// Composite primary key, used instead of a column-level one
    pub primary_key: Option<Vec<String>>,
    pub unique_constraints: Vec<Vec<String>>,
    pub foreign_keys: Vec<ForeignKey>,
    /// Parent of a placeholder cluster: rows may be staged with a
    /// [`TempId`](crate::TempId) that children reference before the parent
    /// has a real identity.
    pub assigns_identities: bool,
}

impl TableSchema {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            indexes: Vec::new(),
            primary_key: None,
            unique_constraints: Vec::new(),
            foreign_keys: Vec::new(),
            assigns_identities: false,
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    pub fn index(mut self, name: &str, columns: &[&str]) -> Self {
        self.indexes.push(Index {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            predicate: None,
        });
        self
    }

    pub fn partial_index(mut self, name: &str, columns: &[&str], predicate: &str) -> Self {
        self.indexes.push(Index {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            predicate: Some(predicate.to_string()),
        });
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn unique(mut self, columns: &[&str]) -> Self {
        self.unique_constraints
            .push(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn foreign_key(mut self, local: &[&str], foreign_table: &str, foreign: &[&str]) -> Self {
        self.foreign_keys.push(ForeignKey::new(local, foreign_table, foreign));
        self
    }

    pub fn assigns_identities(mut self) -> Self {
        self.assigns_identities = true;
        self
    }

    /// Column names in definition order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.get_column(name).is_some()
    }

    pub fn identity_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_identity())
    }

    /// Columns a staged row binds to, in order: everything but identities
    pub fn insertable_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| !c.is_identity()).collect()
    }

    /// Primary key columns, whether declared per column or as a composite
    pub fn primary_key_columns(&self) -> Vec<&str> {
        match &self.primary_key {
            Some(cols) => cols.iter().map(String::as_str).collect(),
            None => self
                .columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.as_str())
                .collect(),
        }
    }

    /// True when `columns` is exactly the primary key or one UNIQUE group
    pub fn is_unique_key(&self, columns: &[String]) -> bool {
        let wanted: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
        let pk: BTreeSet<&str> = self.primary_key_columns().into_iter().collect();
        if !pk.is_empty() && pk == wanted {
            return true;
        }
        self.unique_constraints
            .iter()
            .any(|group| group.iter().map(String::as_str).collect::<BTreeSet<_>>() == wanted)
    }

    /// Foreign keys of this table pointing at `table`
    pub fn references<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.foreign_keys.iter().filter(move |fk| fk.foreign_table == table)
    }

    /// Generate the CREATE TABLE statement
    pub fn create_table_sql(&self) -> String {
        let mut defs: Vec<String> = self.columns.iter().map(Column::to_sql).collect();

        if let Some(pk) = &self.primary_key {
            defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }

        for group in &self.unique_constraints {
            defs.push(format!("UNIQUE({})", group.join(", ")));
        }

        for fk in &self.foreign_keys {
            defs.push(fk.to_sql());
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            defs.join(",\n    ")
        )
    }

    /// Generate the CREATE INDEX statements
    pub fn create_indexes_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|idx| {
                let mut sql = format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                    idx.name,
                    self.name,
                    idx.columns.join(", ")
                );
                if let Some(predicate) = &idx.predicate {
                    sql.push_str(&format!(" WHERE {predicate}"));
                }
                sql
            })
            .collect()
    }

    /// Compare this definition with the live table.
    ///
    /// Never fails: problems reading the store are reported as mismatches.
    /// Extra live columns are tolerated.
    pub fn validate_against_db(&self, conn: &Connection) -> Vec<String> {
        match self.diff_live(conn) {
            Ok(errors) => errors,
            Err(e) => vec![format!("Could not inspect table {}: {}", self.name, e)],
        }
    }

    fn diff_live(&self, conn: &Connection) -> rusqlite::Result<Vec<String>> {
        let mut errors = Vec::new();

        let create_sql: Option<Option<String>> = conn
            .query_row(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [&self.name],
                |row| row.get(0),
            )
            .optional()?;
        let Some(create_sql) = create_sql else {
            errors.push(format!("Table {} does not exist", self.name));
            return Ok(errors);
        };

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", self.name))?;
        let live: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(1)?, row.get(2)?)))?
            .collect::<rusqlite::Result<_>>()?;

        for col in &self.columns {
            match live.iter().find(|(name, _)| *name == col.name) {
                None => errors.push(format!("Column {}.{} missing in database", self.name, col.name)),
                Some((_, ty)) if !ty.eq_ignore_ascii_case(col.ty.as_str()) => errors.push(format!(
                    "Column {}.{} type mismatch: expected {}, got {}",
                    self.name, col.name, col.ty, ty
                )),
                Some(_) => {}
            }
        }

        for idx in &self.indexes {
            let found: Option<String> = conn
                .query_row(
                    "SELECT name FROM sqlite_master WHERE type = 'index' AND name = ?1 AND tbl_name = ?2",
                    [&idx.name, &self.name],
                    |row| row.get(0),
                )
                .optional()?;
            if found.is_none() {
                errors.push(format!("Index {} missing on table {}", idx.name, self.name));
            }
        }

        let create_sql = create_sql.unwrap_or_default();
        for group in &self.unique_constraints {
            let cols = group.join(", ");
            if !create_sql.contains(&format!("UNIQUE({cols})"))
                && !create_sql.contains(&format!("UNIQUE ({cols})"))
            {
                errors.push(format!(
                    "UNIQUE constraint on ({cols}) missing in database table {}",
                    self.name
                ));
            }
        }

        Ok(errors)
    }
}

/// View unioning a "transformed" table with its syntax-preserving twin
#[derive(Debug, Clone, PartialEq)]
pub struct UnifiedView {
    pub name: String,
    pub transformed: String,
    pub preserved: String,
    pub columns: Vec<String>,
    /// Column of the preserved table naming its extraction mode
    pub mode_column: String,
    /// Literal mode reported for rows of the transformed table
    pub transformed_mode: String,
}

impl UnifiedView {
    pub fn new(name: &str, transformed: &str, preserved: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            transformed: transformed.to_string(),
            preserved: preserved.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            mode_column: "jsx_mode".to_string(),
            transformed_mode: "transformed".to_string(),
        }
    }

    pub fn create_view_sql(&self) -> String {
        let cols = self.columns.join(", ");
        format!(
            "CREATE VIEW IF NOT EXISTS {name} AS SELECT {cols}, '{mode}' AS {mode_col} FROM {t} \
             UNION ALL SELECT {cols}, {mode_col} FROM {p}",
            name = self.name,
            mode = self.transformed_mode,
            mode_col = self.mode_column,
            t = self.transformed,
            p = self.preserved,
        )
    }

    pub fn validate(&self, registry: &SchemaRegistry) -> Vec<String> {
        let mut errors = Vec::new();
        for table in [&self.transformed, &self.preserved] {
            let Some(schema) = registry.get(table) else {
                errors.push(format!("View {} unions unknown table '{table}'", self.name));
                continue;
            };
            for col in &self.columns {
                if !schema.has_column(col) {
                    errors.push(format!("View {} column '{col}' not found in table '{table}'", self.name));
                }
            }
        }
        if let Some(preserved) = registry.get(&self.preserved) {
            if !preserved.has_column(&self.mode_column) {
                errors.push(format!(
                    "View {} mode column '{}' not found in table '{}'",
                    self.name, self.mode_column, self.preserved
                ));
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn endpoints() -> TableSchema {
        TableSchema::new("api_endpoints")
            .column(Column::text("file").not_null())
            .column(Column::integer("line").not_null())
            .column(Column::text("method").not_null())
            .column(Column::boolean("has_auth").with_default("0"))
            .unique(&["file", "line"])
            .index("idx_api_endpoints_file", &["file"])
    }

    #[test]
    fn test_create_table_sql() {
        let sql = endpoints().create_table_sql();
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS api_endpoints (\n    file TEXT NOT NULL,\n    line INTEGER NOT NULL,\n    method TEXT NOT NULL,\n    has_auth BOOLEAN DEFAULT 0,\n    UNIQUE(file, line)\n)"
        );
    }

    #[test]
    fn test_partial_index_sql() {
        let table = TableSchema::new("refs")
            .column(Column::text("src"))
            .partial_index("idx_refs_src", &["src"], "src IS NOT NULL");
        assert_eq!(
            table.create_indexes_sql(),
            vec!["CREATE INDEX IF NOT EXISTS idx_refs_src ON refs (src) WHERE src IS NOT NULL"]
        );
    }

    #[test]
    fn test_unique_key_detection() {
        let table = endpoints();
        assert!(table.is_unique_key(&["line".to_string(), "file".to_string()]));
        assert!(!table.is_unique_key(&["file".to_string()]));
    }

    #[test]
    fn test_validate_against_db_reports_drift() {
        let conn = Connection::open_in_memory().unwrap();
        let table = endpoints();
        assert_eq!(table.validate_against_db(&conn), vec!["Table api_endpoints does not exist"]);

        conn.execute_batch("CREATE TABLE api_endpoints (file TEXT, line TEXT, has_auth BOOLEAN)")
            .unwrap();
        let errors = table.validate_against_db(&conn);
        assert!(errors.iter().any(|e| e.contains("api_endpoints.line type mismatch")));
        assert!(errors.iter().any(|e| e.contains("api_endpoints.method missing")));
        assert!(errors.iter().any(|e| e.contains("Index idx_api_endpoints_file missing")));
        assert!(errors.iter().any(|e| e.contains("UNIQUE constraint on (file, line)")));
    }

    #[test]
    fn test_validate_against_db_clean_after_create() {
        let conn = Connection::open_in_memory().unwrap();
        let table = endpoints();
        conn.execute_batch(&table.create_table_sql()).unwrap();
        for sql in table.create_indexes_sql() {
            conn.execute_batch(&sql).unwrap();
        }
        assert!(table.validate_against_db(&conn).is_empty());
    }
}

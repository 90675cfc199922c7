//! Schema registry - the single source of truth for every table
//!
//! Built once at start-up from domain partitions, checked against an exact
//! expected table count, self-validated, then passed by reference to every
//! component that needs it. Never mutated after [`RegistryBuilder::build`].

use super::table::{TableSchema, UnifiedView};
use super::is_identifier;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// SQL verb used when flushing a table's queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Fails on any constraint violation
    Insert,
    /// Replaces the conflicting row (re-processed files, dual-pass tables)
    InsertOrReplace,
    /// Skips the conflicting row (facts legitimately reported more than once)
    InsertOrIgnore,
}

impl InsertMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            InsertMode::Insert => "INSERT",
            InsertMode::InsertOrReplace => "INSERT OR REPLACE",
            InsertMode::InsertOrIgnore => "INSERT OR IGNORE",
        }
    }
}

impl fmt::Display for InsertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// One position of the flush order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushEntry {
    pub table: String,
    pub mode: InsertMode,
}

/// Immutable table-name → schema map plus its flush order and views
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    tables: Vec<TableSchema>,
    by_name: HashMap<String, usize>,
    flush_order: Vec<FlushEntry>,
    external: Vec<String>,
    views: Vec<UnifiedView>,
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.by_name.get(name).map(|&i| &self.tables[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Tables in registration order
    pub fn tables(&self) -> impl Iterator<Item = &TableSchema> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table names, sorted, for error messages
    pub fn table_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn flush_order(&self) -> &[FlushEntry] {
        &self.flush_order
    }

    pub fn flush_position(&self, table: &str) -> Option<usize> {
        self.flush_order.iter().position(|e| e.table == table)
    }

    /// Tables populated outside the flush cycle
    pub fn external_tables(&self) -> &[String] {
        &self.external
    }

    pub fn is_external(&self, table: &str) -> bool {
        self.external.iter().any(|t| t == table)
    }

    pub fn views(&self) -> &[UnifiedView] {
        &self.views
    }

    /// Tables whose foreign keys target the identity column of `parent`
    pub fn placeholder_children(&self, parent: &str) -> Vec<&str> {
        let Some(identity) = self.get(parent).and_then(|p| p.identity_column()) else {
            return Vec::new();
        };
        self.tables
            .iter()
            .filter(|t| {
                t.references(parent)
                    .any(|fk| fk.foreign_columns.len() == 1 && fk.foreign_columns[0] == identity.name)
            })
            .map(|t| t.name.as_str())
            .collect()
    }

    /// Registry self-check. Collects every defect rather than stopping at
    /// the first, so a broken contract is reported in one pass.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for table in &self.tables {
            errors.extend(self.validate_table(table));
        }

        let mut seen = HashSet::new();
        for entry in &self.flush_order {
            if !self.contains(&entry.table) {
                errors.push(format!("Flush order names unknown table '{}'", entry.table));
            }
            if !seen.insert(entry.table.as_str()) {
                errors.push(format!("Flush order lists '{}' more than once", entry.table));
            }
            if self.is_external(&entry.table) {
                errors.push(format!(
                    "Table '{}' is externally populated but also in the flush order",
                    entry.table
                ));
            }
        }

        for table in &self.tables {
            if !seen.contains(table.name.as_str()) && !self.is_external(&table.name) {
                errors.push(format!("Table '{}' is missing from the flush order", table.name));
            }
        }

        for name in &self.external {
            if !self.contains(name) {
                errors.push(format!("External table '{name}' is not registered"));
            }
        }

        errors.extend(self.validate_flush_dependencies());

        for view in &self.views {
            if !is_identifier(&view.name) {
                errors.push(format!("View name '{}' is not a plain identifier", view.name));
            }
            errors.extend(view.validate(self));
        }

        errors
    }

    fn validate_table(&self, table: &TableSchema) -> Vec<String> {
        let mut errors = Vec::new();
        let name = &table.name;

        if !is_identifier(name) {
            errors.push(format!("Table name '{name}' is not a plain identifier"));
        }
        if table.columns.is_empty() {
            errors.push(format!("Table '{name}' has no columns"));
        }

        let mut seen = HashSet::new();
        for col in &table.columns {
            if !is_identifier(&col.name) {
                errors.push(format!("Column name '{name}.{}' is not a plain identifier", col.name));
            }
            if !seen.insert(col.name.as_str()) {
                errors.push(format!("Column '{name}.{}' is declared twice", col.name));
            }
            errors.extend(col.validate(name));
        }

        if let Some(pk) = &table.primary_key {
            if table.columns.iter().any(|c| c.primary_key) {
                errors.push(format!(
                    "Table '{name}' declares both a column primary key and a composite one"
                ));
            }
            for col in pk {
                if !table.has_column(col) {
                    errors.push(format!("Primary key column '{col}' not found in table '{name}'"));
                }
            }
        }

        for group in &table.unique_constraints {
            for col in group {
                if !table.has_column(col) {
                    errors.push(format!("UNIQUE column '{col}' not found in table '{name}'"));
                }
            }
        }

        for idx in &table.indexes {
            if !is_identifier(&idx.name) {
                errors.push(format!("Index name '{}' is not a plain identifier", idx.name));
            }
            for col in &idx.columns {
                if !table.has_column(col) {
                    errors.push(format!(
                        "Index {} column '{col}' not found in table '{name}'",
                        idx.name
                    ));
                }
            }
        }

        for fk in &table.foreign_keys {
            errors.extend(fk.validate(table, self));
        }

        if table.assigns_identities {
            let identities = table.columns.iter().filter(|c| c.is_identity()).count();
            if identities != 1 {
                errors.push(format!(
                    "Table '{name}' assigns identities but has {identities} identity columns (expected 1)"
                ));
            }
            if let Some(entry) = self.flush_order.iter().find(|e| e.table == *name) {
                if entry.mode != InsertMode::Insert {
                    errors.push(format!(
                        "Table '{name}' assigns identities and must be flushed with INSERT, not {}",
                        entry.mode
                    ));
                }
            }
        }

        errors
    }

    /// Every parent in the flush order must come before its children
    fn validate_flush_dependencies(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (position, entry) in self.flush_order.iter().enumerate() {
            let Some(table) = self.get(&entry.table) else {
                continue;
            };
            for fk in &table.foreign_keys {
                if fk.foreign_table == table.name {
                    continue;
                }
                if let Some(parent) = self.flush_position(&fk.foreign_table) {
                    if parent > position {
                        errors.push(format!(
                            "Flush order puts '{}' (position {position}) before its parent '{}' (position {parent})",
                            table.name, fk.foreign_table
                        ));
                    }
                }
            }
        }
        errors
    }
}

/// Assembles a [`SchemaRegistry`] from domain partitions
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    partitions: Vec<(String, Vec<TableSchema>)>,
    flush_order: Vec<FlushEntry>,
    external: Vec<String>,
    views: Vec<UnifiedView>,
    expected: Option<usize>,
}

impl RegistryBuilder {
    pub fn partition(mut self, domain: &str, tables: Vec<TableSchema>) -> Self {
        self.partitions.push((domain.to_string(), tables));
        self
    }

    pub fn flush(mut self, table: &str, mode: InsertMode) -> Self {
        self.flush_order.push(FlushEntry {
            table: table.to_string(),
            mode,
        });
        self
    }

    pub fn flush_order(mut self, entries: &[(&str, InsertMode)]) -> Self {
        for (table, mode) in entries {
            self = self.flush(table, *mode);
        }
        self
    }

    pub fn external(mut self, table: &str) -> Self {
        self.external.push(table.to_string());
        self
    }

    pub fn view(mut self, view: UnifiedView) -> Self {
        self.views.push(view);
        self
    }

    /// Drift guard: the merged registry must hold exactly `count` tables
    pub fn expect_tables(mut self, count: usize) -> Self {
        self.expected = Some(count);
        self
    }

    /// Merge the partitions and run the self-check.
    ///
    /// # Errors
    ///
    /// `SchemaContract` listing every defect: duplicate table names across
    /// partitions, a count different from [`expect_tables`](Self::expect_tables),
    /// or anything [`SchemaRegistry::validate`] reports.
    pub fn build(self) -> Result<SchemaRegistry> {
        let mut errors = Vec::new();
        let mut tables = Vec::new();
        let mut by_name = HashMap::new();
        let mut origin: HashMap<String, String> = HashMap::new();

        for (domain, partition) in self.partitions {
            for table in partition {
                if let Some(first) = origin.get(&table.name) {
                    errors.push(format!(
                        "Table '{}' defined in both '{first}' and '{domain}' partitions",
                        table.name
                    ));
                    continue;
                }
                origin.insert(table.name.clone(), domain.clone());
                by_name.insert(table.name.clone(), tables.len());
                tables.push(table);
            }
        }

        if let Some(expected) = self.expected {
            if tables.len() != expected {
                errors.push(format!(
                    "Schema registry holds {} tables, expected exactly {expected}",
                    tables.len()
                ));
            }
        }

        let registry = SchemaRegistry {
            tables,
            by_name,
            flush_order: self.flush_order,
            external: self.external,
            views: self.views,
        };
        errors.extend(registry.validate());

        if errors.is_empty() {
            tracing::debug!(tables = registry.len(), "schema registry loaded");
            Ok(registry)
        } else {
            Err(Error::SchemaContract(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn files() -> TableSchema {
        TableSchema::new("files").column(Column::text("path").primary_key())
    }

    fn symbols() -> TableSchema {
        TableSchema::new("symbols")
            .column(Column::text("path").not_null())
            .column(Column::text("name").not_null())
            .foreign_key(&["path"], "files", &["path"])
    }

    fn contract_errors(result: Result<SchemaRegistry>) -> Vec<String> {
        match result {
            Err(Error::SchemaContract(errors)) => errors,
            other => panic!("expected a contract error, got {other:?}"),
        }
    }

    #[test]
    fn test_build_valid_registry() {
        let registry = SchemaRegistry::builder()
            .partition("core", vec![files(), symbols()])
            .flush("files", InsertMode::InsertOrReplace)
            .flush("symbols", InsertMode::Insert)
            .expect_tables(2)
            .build()
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.flush_position("symbols"), Some(1));
    }

    #[test]
    fn test_count_guard() {
        let errors = contract_errors(
            SchemaRegistry::builder()
                .partition("core", vec![files()])
                .flush("files", InsertMode::Insert)
                .expect_tables(2)
                .build(),
        );
        assert_eq!(errors, vec!["Schema registry holds 1 tables, expected exactly 2"]);
    }

    #[test]
    fn test_duplicate_across_partitions() {
        let errors = contract_errors(
            SchemaRegistry::builder()
                .partition("core", vec![files()])
                .partition("node", vec![files()])
                .flush("files", InsertMode::Insert)
                .build(),
        );
        assert!(errors[0].contains("defined in both 'core' and 'node'"));
    }

    #[test]
    fn test_flush_order_must_put_parents_first() {
        let errors = contract_errors(
            SchemaRegistry::builder()
                .partition("core", vec![files(), symbols()])
                .flush("symbols", InsertMode::Insert)
                .flush("files", InsertMode::Insert)
                .build(),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("before its parent 'files'"));
    }

    #[test]
    fn test_flush_order_coverage() {
        let errors = contract_errors(
            SchemaRegistry::builder()
                .partition("core", vec![files(), symbols()])
                .flush("files", InsertMode::Insert)
                .flush("ghosts", InsertMode::Insert)
                .build(),
        );
        assert!(errors.iter().any(|e| e.contains("unknown table 'ghosts'")));
        assert!(errors.iter().any(|e| e.contains("'symbols' is missing from the flush order")));
    }

    #[test]
    fn test_external_tables_skip_flush_order() {
        let registry = SchemaRegistry::builder()
            .partition("core", vec![files()])
            .external("files")
            .build()
            .unwrap();
        assert!(registry.is_external("files"));
    }

    #[test]
    fn test_foreign_key_defects_reported_together() {
        let broken = TableSchema::new("refs")
            .column(Column::text("src"))
            .foreign_key(&["src", "nope"], "files", &["path"])
            .foreign_key(&["src"], "missing_table", &["path"]);
        let errors = contract_errors(
            SchemaRegistry::builder()
                .partition("core", vec![files(), broken])
                .flush("files", InsertMode::Insert)
                .flush("refs", InsertMode::Insert)
                .build(),
        );
        assert!(errors.iter().any(|e| e.contains("Local column 'nope' not found")));
        assert!(errors.iter().any(|e| e.contains("column count mismatch")));
        assert!(errors.iter().any(|e| e.contains("'missing_table' which does not exist")));
    }

    #[test]
    fn test_foreign_key_must_target_unique_columns() {
        let loose = TableSchema::new("loose")
            .column(Column::text("path"))
            .column(Column::text("name"));
        let child = TableSchema::new("child")
            .column(Column::text("name"))
            .foreign_key(&["name"], "loose", &["name"]);
        let errors = contract_errors(
            SchemaRegistry::builder()
                .partition("core", vec![loose, child])
                .flush("loose", InsertMode::Insert)
                .flush("child", InsertMode::Insert)
                .build(),
        );
        assert!(errors[0].contains("does not target the primary key or a UNIQUE group"));
    }

    #[test]
    fn test_identity_parent_rules() {
        let blocks = TableSchema::new("blocks")
            .column(Column::text("file"))
            .assigns_identities();
        let errors = contract_errors(
            SchemaRegistry::builder()
                .partition("core", vec![blocks])
                .flush("blocks", InsertMode::InsertOrReplace)
                .build(),
        );
        assert!(errors.iter().any(|e| e.contains("has 0 identity columns")));
        assert!(errors.iter().any(|e| e.contains("must be flushed with INSERT")));
    }

    #[test]
    fn test_identifiers_are_checked() {
        let bad = TableSchema::new("files; DROP TABLE x").column(Column::text("path"));
        let errors = contract_errors(
            SchemaRegistry::builder()
                .partition("core", vec![bad])
                .external("files; DROP TABLE x")
                .build(),
        );
        assert!(errors[0].contains("is not a plain identifier"));
    }

    #[test]
    fn test_placeholder_children() {
        let blocks = TableSchema::new("blocks")
            .column(Column::identity("id"))
            .column(Column::text("file"))
            .assigns_identities();
        let edges = TableSchema::new("edges")
            .column(Column::integer("source"))
            .foreign_key(&["source"], "blocks", &["id"]);
        let registry = SchemaRegistry::builder()
            .partition("core", vec![blocks, edges])
            .flush("blocks", InsertMode::Insert)
            .flush("edges", InsertMode::Insert)
            .build()
            .unwrap();
        assert_eq!(registry.placeholder_children("blocks"), vec!["edges"]);
        assert!(registry.placeholder_children("edges").is_empty());
    }
}

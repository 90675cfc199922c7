//! Live-store audit against the schema contract

use crate::schema::SchemaRegistry;
use crate::storage::Database;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;

/// Compare every table and view in the registry with the live store.
///
/// Returns only the entries with mismatches, keyed by table or view name;
/// an empty map means the store matches the contract. Never fails: a table
/// that cannot be inspected is reported as a mismatch.
pub fn validate_all(conn: &Connection, registry: &SchemaRegistry) -> BTreeMap<String, Vec<String>> {
    let mut report = BTreeMap::new();

    for table in registry.tables() {
        let mismatches = table.validate_against_db(conn);
        if !mismatches.is_empty() {
            report.insert(table.name.clone(), mismatches);
        }
    }

    for view in registry.views() {
        let exists = conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'view' AND name = ?1",
                [&view.name],
                |_| Ok(()),
            )
            .optional();
        match exists {
            Ok(Some(())) => {}
            Ok(None) => {
                report.insert(view.name.clone(), vec![format!("View {} does not exist", view.name)]);
            }
            Err(e) => {
                report.insert(
                    view.name.clone(),
                    vec![format!("Could not inspect view {}: {e}", view.name)],
                );
            }
        }
    }

    for (name, mismatches) in &report {
        tracing::warn!(relation = %name, mismatches = mismatches.len(), "schema drift");
    }
    report
}

impl Database<'_> {
    /// Audit this store against its registry
    pub fn validate(&self) -> BTreeMap<String, Vec<String>> {
        validate_all(self.connection(), self.registry())
    }
}

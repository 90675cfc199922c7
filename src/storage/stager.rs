//! Batch stager - per-table queues of rows waiting for the next flush

use crate::value::{TempId, Value};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Default rows per queue before [`Stager::should_flush`] reports true
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// One staged row, positional to its table's insertable columns
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRow {
    /// Set only for rows of identity-assigning parents
    pub placeholder: Option<TempId>,
    pub values: Vec<Value>,
}

/// Append-only queues keyed by table name.
///
/// Knows nothing about schemas: table and shape checks belong to the
/// [`Database`](crate::Database) that owns it and to the flush engine.
#[derive(Debug)]
pub struct Stager {
    queues: HashMap<String, Vec<PendingRow>>,
    placeholders: HashSet<TempId>,
    batch_size: usize,
}

impl Default for Stager {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl Stager {
    pub fn new(batch_size: usize) -> Self {
        Self {
            queues: HashMap::new(),
            placeholders: HashSet::new(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn set_batch_size(&mut self, batch_size: usize) {
        self.batch_size = batch_size.max(1);
    }

    pub fn append(&mut self, table: &str, values: Vec<Value>) {
        self.queue(table).push(PendingRow {
            placeholder: None,
            values,
        });
    }

    /// Queue a parent row under a caller-chosen placeholder.
    ///
    /// # Errors
    ///
    /// `Placeholder` if the same placeholder was already staged this cycle.
    pub fn append_parent(&mut self, table: &str, placeholder: TempId, values: Vec<Value>) -> Result<()> {
        if !self.placeholders.insert(placeholder) {
            return Err(Error::Placeholder(format!(
                "placeholder {placeholder} is already staged in this cycle"
            )));
        }
        self.queue(table).push(PendingRow {
            placeholder: Some(placeholder),
            values,
        });
        Ok(())
    }

    fn queue(&mut self, table: &str) -> &mut Vec<PendingRow> {
        self.queues.entry(table.to_string()).or_default()
    }

    /// Rows queued for `table`, oldest first
    pub fn rows(&self, table: &str) -> &[PendingRow] {
        self.queues.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    /// Tables with at least one queued row, sorted
    pub fn tables(&self) -> Vec<&str> {
        let mut tables: Vec<&str> = self
            .queues
            .iter()
            .filter(|(_, rows)| !rows.is_empty())
            .map(|(name, _)| name.as_str())
            .collect();
        tables.sort_unstable();
        tables
    }

    pub fn pending_rows(&self) -> usize {
        self.queues.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.values().all(Vec::is_empty)
    }

    /// True once any queue has reached the batch size
    pub fn should_flush(&self) -> bool {
        self.queues.values().any(|rows| rows.len() >= self.batch_size)
    }

    /// Drop one queue and release the placeholders it held
    pub fn clear(&mut self, table: &str) -> usize {
        let Some(rows) = self.queues.remove(table) else {
            return 0;
        };
        for placeholder in rows.iter().filter_map(|r| r.placeholder) {
            self.placeholders.remove(&placeholder);
        }
        rows.len()
    }

    pub fn clear_all(&mut self) -> usize {
        let dropped = self.pending_rows();
        self.queues.clear();
        self.placeholders.clear();
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn test_queues_are_created_lazily() {
        let mut stager = Stager::default();
        assert!(stager.is_empty());
        assert!(stager.rows("files").is_empty());

        stager.append("files", row!["a.py"]);
        stager.append("files", row!["b.py"]);
        stager.append("symbols", row!["a.py", "foo"]);

        assert_eq!(stager.rows("files").len(), 2);
        assert_eq!(stager.rows("files")[1].values, row!["b.py"]);
        assert_eq!(stager.tables(), vec!["files", "symbols"]);
        assert_eq!(stager.pending_rows(), 3);
    }

    #[test]
    fn test_duplicate_placeholder_rejected() {
        let mut stager = Stager::default();
        let tmp = TempId::new(-1).unwrap();
        stager.append_parent("cfg_blocks", tmp, row!["a.py"]).unwrap();
        let err = stager.append_parent("cfg_blocks", tmp, row!["b.py"]).unwrap_err();
        assert!(matches!(err, Error::Placeholder(_)));
        assert_eq!(stager.rows("cfg_blocks").len(), 1);
    }

    #[test]
    fn test_clear_releases_placeholders() {
        let mut stager = Stager::default();
        let tmp = TempId::new(-3).unwrap();
        stager.append_parent("cfg_blocks", tmp, row!["a.py"]).unwrap();
        stager.append("cfg_edges", row!["a.py", tmp]);

        assert_eq!(stager.clear("cfg_blocks"), 1);
        assert_eq!(stager.pending_rows(), 1);
        assert!(stager.append_parent("cfg_blocks", tmp, row!["a.py"]).is_ok());

        assert_eq!(stager.clear_all(), 2);
        assert!(stager.is_empty());
    }

    #[test]
    fn test_should_flush_at_batch_size() {
        let mut stager = Stager::new(2);
        stager.append("refs", row!["a.py"]);
        assert!(!stager.should_flush());
        stager.append("refs", row!["b.py"]);
        assert!(stager.should_flush());
    }
}

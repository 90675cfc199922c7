//! # Factstore - persistence core for static-analysis facts
//!
//! Turns a flood of independently-produced facts into durable,
//! referentially-correct SQLite rows, and back into typed result sets.
//!
//! Factstore provides:
//! - A schema contract (tables, columns, foreign keys, views) that generates DDL
//!   and audits a live store for drift
//! - A batch stager with forward-reference placeholders for rows whose parent
//!   has no identity yet
//! - A flush engine that drains staged rows in foreign-key order inside one
//!   transaction and classifies integrity failures
//! - A query builder that only emits identifiers known to the contract

pub mod config;
pub mod query;
pub mod schema;
pub mod storage;
pub mod ui;
pub mod validator;
pub mod value;

// Re-exports for convenient access
pub use query::{Aggregate, Filter, JoinKind, JoinSpec, OrderBy, Query, QueryBuilder};
pub use schema::{Column, ColumnType, ForeignKey, InsertMode, SchemaRegistry, TableSchema};
pub use storage::{Database, FlushFailure, FlushState, FlushStats, Finding};
pub use value::{RowRef, TempId, Value};

/// Result type alias for Factstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Factstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The contract itself is inconsistent, or a caller named something the
    /// contract does not define. Fatal at start-up.
    #[error("Schema contract violated:\n  - {}", .0.join("\n  - "))]
    SchemaContract(Vec<String>),

    /// A uniqueness violation while flushing.
    #[error("Duplicate insertion: {0}")]
    DuplicateInsertion(Box<FlushFailure>),

    /// A foreign-key violation (or an unresolved placeholder) while flushing.
    #[error("Orphan reference: {0}")]
    OrphanReference(Box<FlushFailure>),

    /// Any other store error while flushing.
    #[error("Flush failed: {0}")]
    Flush(Box<FlushFailure>),

    #[error("Query contract violated: {0}")]
    QueryContract(String),

    #[error("Row shape mismatch for table '{table}': {detail}")]
    RowShape { table: String, detail: String },

    #[error("Invalid placeholder: {0}")]
    Placeholder(String),

    #[error("A flush cycle failed; clear the affected queues or roll back before staging or flushing again")]
    CycleFailed,

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a single-defect contract error
    pub fn contract(message: impl Into<String>) -> Self {
        Error::SchemaContract(vec![message.into()])
    }

    /// Table whose queue broke a flush cycle, when the error names one
    pub fn failed_table(&self) -> Option<&str> {
        match self {
            Error::DuplicateInsertion(f) | Error::OrphanReference(f) | Error::Flush(f) => {
                Some(&f.table)
            }
            Error::RowShape { table, .. } => Some(table),
            _ => None,
        }
    }

    /// True for the two integrity classes raised by a flush
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::DuplicateInsertion(_) | Error::OrphanReference(_))
    }
}

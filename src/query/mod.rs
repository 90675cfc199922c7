//! Query Layer - schema-checked SELECT generation
//!
//! The only sanctioned read path. Every table and column identifier that
//! reaches generated SQL has been looked up in the [`SchemaRegistry`](crate::SchemaRegistry);
//! values travel as bound parameters.

mod builder;
mod filter;

pub use builder::{Aggregate, JoinKind, JoinSpec, QueryBuilder};
pub use filter::{Filter, FilterOp, OrderBy};

use crate::value::Value;

/// A generated statement, ready for [`Database::fetch`](crate::Database::fetch)
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    /// Bound in order to the statement's `?` parameters
    pub params: Vec<Value>,
    /// Output column labels, in select-list order
    pub columns: Vec<String>,
}

//! Storage Layer - SQLite-backed persistence
//!
//! Rows reach the store in two ways:
//! - staged by producers into per-table queues and drained by a flush cycle
//!   in foreign-key order (stager, flush)
//! - written directly for externally populated tables (findings)
//!
//! Integrity failures are classified once, in `classify`.

mod classify;
mod findings;
pub mod flush;
mod sqlite;
pub mod stager;

pub use findings::{Finding, FINDINGS_TABLE};
pub use flush::{FlushFailure, FlushState, FlushStats};
pub use sqlite::Database;
pub use stager::{PendingRow, Stager, DEFAULT_BATCH_SIZE};

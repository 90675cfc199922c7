//! Schema contract: the authoritative definition of every fact table

mod column;
mod registry;
mod table;
pub mod tables;

pub use column::{Column, ColumnType};
pub use registry::{FlushEntry, InsertMode, RegistryBuilder, SchemaRegistry};
pub use table::{ForeignKey, Index, TableSchema, UnifiedView};

use regex::Regex;
use std::sync::LazyLock;

static IDENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern compiles"));

/// True for a bare SQL identifier (`[A-Za-z_][A-Za-z0-9_]*`).
///
/// Table, column, index and view names are interpolated into generated
/// statements, so anything else is rejected at registry load.
pub fn is_identifier(name: &str) -> bool {
    IDENT.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("cfg_blocks_jsx"));
        assert!(is_identifier("_private1"));
        assert!(!is_identifier("1table"));
        assert!(!is_identifier("files; DROP TABLE files"));
        assert!(!is_identifier("a.b"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("name\n"));
    }
}

//! Store error classification
//!
//! The only place that decides what kind of integrity failure a rusqlite
//! error is. Reads the extended result code, never the message text.

use super::flush::FlushFailure;
use crate::Error;
use rusqlite::ffi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// UNIQUE or PRIMARY KEY
    Duplicate,
    /// FOREIGN KEY, or a placeholder with no recorded identifier
    Orphan,
    Other,
}

impl Violation {
    pub fn of(err: &rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, _) => match e.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    Violation::Duplicate
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Violation::Orphan,
                _ => Violation::Other,
            },
            _ => Violation::Other,
        }
    }

    /// Where to look first
    pub fn hint(self) -> Option<&'static str> {
        match self {
            Violation::Duplicate => Some(
                "the producer staged the same key twice; de-duplicate upstream before staging",
            ),
            Violation::Orphan => Some(
                "the parent row was never staged, or FLUSH_ORDER (schema::tables) flushes this table before its parent",
            ),
            Violation::Other => None,
        }
    }

    pub fn into_error(self, failure: FlushFailure) -> Error {
        let failure = Box::new(failure);
        match self {
            Violation::Duplicate => Error::DuplicateInsertion(failure),
            Violation::Orphan => Error::OrphanReference(failure),
            Violation::Other => Error::Flush(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn store() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE parent (id TEXT PRIMARY KEY);
             CREATE TABLE child (pid TEXT, tag TEXT UNIQUE, n INTEGER CHECK(n > 0),
                                 FOREIGN KEY (pid) REFERENCES parent (id));
             INSERT INTO parent VALUES ('p');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_classify_by_extended_code() {
        let conn = store();
        let dup = conn.execute("INSERT INTO parent VALUES ('p')", []).unwrap_err();
        assert_eq!(Violation::of(&dup), Violation::Duplicate);

        conn.execute("INSERT INTO child VALUES ('p', 't', 1)", []).unwrap();
        let dup_unique = conn.execute("INSERT INTO child VALUES ('p', 't', 1)", []).unwrap_err();
        assert_eq!(Violation::of(&dup_unique), Violation::Duplicate);

        let orphan = conn.execute("INSERT INTO child VALUES ('x', 'u', 1)", []).unwrap_err();
        assert_eq!(Violation::of(&orphan), Violation::Orphan);

        let check = conn.execute("INSERT INTO child VALUES ('p', 'v', 0)", []).unwrap_err();
        assert_eq!(Violation::of(&check), Violation::Other);
    }

    #[test]
    fn test_non_sqlite_errors_are_other() {
        assert_eq!(Violation::of(&rusqlite::Error::QueryReturnedNoRows), Violation::Other);
        assert!(Violation::Other.hint().is_none());
    }
}

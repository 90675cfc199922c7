//! Column definitions

use serde::Serialize;
use std::fmt;

/// Declared storage type of a column.
///
/// No collection type exists; collection-shaped facts live in junction tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    Blob,
    /// Stored as INTEGER 0/1, declared as BOOLEAN
    Boolean,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Blob => "BLOB",
            ColumnType::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A database column with type and constraints
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub default: Option<String>,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub check: Option<String>,
}

impl Column {
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            nullable: true,
            default: None,
            primary_key: false,
            autoincrement: false,
            check: None,
        }
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, ColumnType::Text)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, ColumnType::Integer)
    }

    pub fn real(name: &str) -> Self {
        Self::new(name, ColumnType::Real)
    }

    pub fn blob(name: &str) -> Self {
        Self::new(name, ColumnType::Blob)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, ColumnType::Boolean)
    }

    /// Store-assigned identity: `INTEGER PRIMARY KEY AUTOINCREMENT`
    pub fn identity(name: &str) -> Self {
        Self::integer(name).autoincrement()
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Raw SQL default expression, e.g. `"'source'"` or `"0"`
    pub fn with_default(mut self, expr: &str) -> Self {
        self.default = Some(expr.to_string());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self.primary_key().not_null()
    }

    pub fn check(mut self, expr: &str) -> Self {
        self.check = Some(expr.to_string());
        self
    }

    /// Identity columns are filled by the store and never staged
    pub fn is_identity(&self) -> bool {
        self.autoincrement
    }

    /// Generate the column clause of a CREATE TABLE statement
    pub fn to_sql(&self) -> String {
        let mut parts = vec![self.name.clone(), self.ty.as_str().to_string()];
        if !self.nullable {
            parts.push("NOT NULL".to_string());
        }
        if let Some(default) = &self.default {
            parts.push(format!("DEFAULT {default}"));
        }
        if self.primary_key {
            parts.push("PRIMARY KEY".to_string());
            if self.autoincrement {
                parts.push("AUTOINCREMENT".to_string());
            }
        }
        if let Some(check) = &self.check {
            parts.push(format!("CHECK({check})"));
        }
        parts.join(" ")
    }

    /// Check the column's own constraints
    pub fn validate(&self, table: &str) -> Vec<String> {
        let mut errors = Vec::new();
        if self.autoincrement && !(self.primary_key && self.ty == ColumnType::Integer) {
            errors.push(format!(
                "Column {table}.{} is AUTOINCREMENT but not an INTEGER PRIMARY KEY",
                self.name
            ));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_sql() {
        assert_eq!(Column::text("path").primary_key().to_sql(), "path TEXT NOT NULL PRIMARY KEY");
        assert_eq!(
            Column::text("file_category").not_null().with_default("'source'").to_sql(),
            "file_category TEXT NOT NULL DEFAULT 'source'"
        );
        assert_eq!(
            Column::identity("id").to_sql(),
            "id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT"
        );
        assert_eq!(
            Column::text("command").not_null().check("command != 'UNKNOWN'").to_sql(),
            "command TEXT NOT NULL CHECK(command != 'UNKNOWN')"
        );
        assert_eq!(Column::boolean("is_typed").with_default("0").to_sql(), "is_typed BOOLEAN DEFAULT 0");
    }

    #[test]
    fn test_autoincrement_requires_integer_primary_key() {
        let mut bad = Column::text("id");
        bad.autoincrement = true;
        bad.primary_key = true;
        assert_eq!(bad.validate("t").len(), 1);

        let mut not_pk = Column::integer("id");
        not_pk.autoincrement = true;
        assert_eq!(not_pk.validate("t").len(), 1);

        assert!(Column::identity("id").validate("t").is_empty());
    }
}

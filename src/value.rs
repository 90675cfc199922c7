//! Staged values - the positional fields of a fact row
//!
//! A field that may point at a row which has no durable identity yet carries a
//! [`RowRef`] instead of a bare integer, so "is this a forward reference" is a
//! type question rather than a sign convention.

use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use serde::ser::{Serialize, Serializer};
use std::fmt;

/// Caller-chosen placeholder identity for a parent row staged in the current
/// flush cycle. Always negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(i64);

impl TempId {
    /// Create a placeholder; rejects zero and positive values, which are
    /// reserved for identifiers assigned by the store.
    pub fn new(raw: i64) -> crate::Result<Self> {
        if raw < 0 {
            Ok(Self(raw))
        } else {
            Err(crate::Error::Placeholder(format!(
                "placeholder {raw} must be negative"
            )))
        }
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TempId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a row of an identity-assigning table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowRef {
    /// Identifier already assigned by the store. The variant does not check
    /// the sign; [`RowRef::committed`] does.
    Committed(i64),
    /// Placeholder resolved during the flush that inserts its parent
    Placeholder(TempId),
}

impl RowRef {
    /// Reference a stored row; negative values are the placeholder range.
    pub fn committed(id: i64) -> crate::Result<Self> {
        if id < 0 {
            return Err(crate::Error::Placeholder(format!(
                "committed identifier {id} is negative; use a TempId for forward references"
            )));
        }
        Ok(RowRef::Committed(id))
    }
}

/// One positional field of a staged or fetched row
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Ref(RowRef),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) | Value::Ref(RowRef::Committed(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn placeholder(&self) -> Option<TempId> {
        match self {
            Value::Ref(RowRef::Placeholder(t)) => Some(*t),
            _ => None,
        }
    }
}

/// Build a row from heterogeneous values: `row!["a.py", 12, true, None::<i64>]`
#[macro_export]
macro_rules! row {
    () => { Vec::<$crate::Value>::new() };
    ($($v:expr),+ $(,)?) => { vec![$($crate::Value::from($v)),+] };
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Text(s.clone())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Real(f)
    }
}

/// Boolean flags are stored as 0/1
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Integer(i64::from(b))
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl From<RowRef> for Value {
    fn from(r: RowRef) -> Self {
        Value::Ref(r)
    }
}

impl From<TempId> for Value {
    fn from(t: TempId) -> Self {
        Value::Ref(RowRef::Placeholder(t))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(v: ValueRef<'_>) -> Self {
        match v {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) | Value::Ref(RowRef::Committed(i)) => {
                ToSqlOutput::Borrowed(ValueRef::Integer(*i))
            }
            Value::Real(f) => ToSqlOutput::Borrowed(ValueRef::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            // Placeholders are substituted before binding
            Value::Ref(RowRef::Placeholder(t)) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(Box::new(
                    crate::Error::Placeholder(format!("placeholder {t} reached the store unresolved")),
                )));
            }
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
            Value::Ref(RowRef::Committed(id)) => write!(f, "#{id}"),
            Value::Ref(RowRef::Placeholder(t)) => write!(f, "placeholder({t})"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Integer(i) | Value::Ref(RowRef::Committed(i)) => serializer.serialize_i64(*i),
            Value::Real(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Blob(b) => serializer.serialize_bytes(b),
            Value::Ref(RowRef::Placeholder(t)) => serializer.serialize_i64(t.get()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_id_must_be_negative() {
        assert!(TempId::new(-5).is_ok());
        assert!(TempId::new(0).is_err());
        assert!(TempId::new(7).is_err());
    }

    #[test]
    fn test_committed_ref_must_not_be_negative() {
        assert_eq!(RowRef::committed(0).unwrap(), RowRef::Committed(0));
        assert_eq!(Value::from(RowRef::committed(42).unwrap()).as_i64(), Some(42));
        assert!(matches!(RowRef::committed(-3), Err(crate::Error::Placeholder(_))));
    }

    #[test]
    fn test_row_macro_normalizes_flags() {
        let row = row!["a.py", 3, true, false, None::<i64>, Some("x")];
        assert_eq!(
            row,
            vec![
                Value::Text("a.py".into()),
                Value::Integer(3),
                Value::Integer(1),
                Value::Integer(0),
                Value::Null,
                Value::Text("x".into()),
            ]
        );
    }

    #[test]
    fn test_placeholder_refuses_to_bind() {
        let value = Value::from(TempId::new(-1).unwrap());
        assert_eq!(value.placeholder(), TempId::new(-1).ok());
        assert!(value.to_sql().is_err());
    }

    #[test]
    fn test_serialize_to_json() {
        let row = row!["x", 1, 2.5, None::<String>];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"["x",1,2.5,null]"#);
    }
}

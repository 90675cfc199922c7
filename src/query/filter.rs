//! Typed WHERE filters and ORDER BY terms

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    IsNull,
    IsNotNull,
    In,
}

/// One predicate on a column. Values are never interpolated into SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub values: Vec<Value>,
}

impl Filter {
    fn binary(column: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.to_string(),
            op,
            values: vec![value.into()],
        }
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Self::binary(column, FilterOp::Eq, value)
    }

    pub fn ne(column: &str, value: impl Into<Value>) -> Self {
        Self::binary(column, FilterOp::Ne, value)
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Self {
        Self::binary(column, FilterOp::Lt, value)
    }

    pub fn le(column: &str, value: impl Into<Value>) -> Self {
        Self::binary(column, FilterOp::Le, value)
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Self {
        Self::binary(column, FilterOp::Gt, value)
    }

    pub fn ge(column: &str, value: impl Into<Value>) -> Self {
        Self::binary(column, FilterOp::Ge, value)
    }

    /// SQL `LIKE`; `%` and `_` in the pattern keep their wildcard meaning
    pub fn like(column: &str, pattern: impl Into<Value>) -> Self {
        Self::binary(column, FilterOp::Like, pattern)
    }

    pub fn is_null(column: &str) -> Self {
        Self {
            column: column.to_string(),
            op: FilterOp::IsNull,
            values: Vec::new(),
        }
    }

    pub fn is_not_null(column: &str) -> Self {
        Self {
            column: column.to_string(),
            op: FilterOp::IsNotNull,
            values: Vec::new(),
        }
    }

    /// SQL `IN`. An empty list matches nothing.
    pub fn in_list<V: Into<Value>>(column: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            column: column.to_string(),
            op: FilterOp::In,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Render against an already-checked column expression, pushing bound values
    pub(crate) fn render(&self, column_sql: &str, params: &mut Vec<Value>) -> String {
        let op = match self.op {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::Like => "LIKE",
            FilterOp::IsNull => return format!("{column_sql} IS NULL"),
            FilterOp::IsNotNull => return format!("{column_sql} IS NOT NULL"),
            FilterOp::In => {
                let marks = vec!["?"; self.values.len()].join(", ");
                params.extend(self.values.iter().cloned());
                return format!("{column_sql} IN ({marks})");
            }
        };
        params.extend(self.values.iter().take(1).cloned());
        format!("{column_sql} {op} ?")
    }
}

/// One ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: false,
        }
    }

    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            descending: true,
        }
    }

    pub(crate) fn direction(&self) -> &'static str {
        if self.descending { "DESC" } else { "ASC" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_binds_values() {
        let mut params = Vec::new();
        assert_eq!(Filter::eq("name", "foo").render("s.name", &mut params), "s.name = ?");
        assert_eq!(Filter::ge("line", 10).render("line", &mut params), "line >= ?");
        assert_eq!(params, vec![Value::from("foo"), Value::from(10)]);
    }

    #[test]
    fn test_render_null_and_in() {
        let mut params = Vec::new();
        assert_eq!(Filter::is_null("end_line").render("end_line", &mut params), "end_line IS NULL");
        assert_eq!(
            Filter::in_list("type", ["function", "class"]).render("type", &mut params),
            "type IN (?, ?)"
        );
        assert_eq!(params.len(), 2);
        assert_eq!(
            Filter::in_list::<i64>("line", []).render("line", &mut params),
            "line IN ()"
        );
    }
}

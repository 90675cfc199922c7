use crate::value::Value;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
pub struct CountRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

/// Row counts per table; empty tables are skipped unless `include_empty`
pub fn counts_table(counts: &[(String, usize)], include_empty: bool) -> String {
    let rows: Vec<CountRow> = counts
        .iter()
        .filter(|(_, n)| include_empty || *n > 0)
        .map(|(table, rows)| CountRow {
            table: table.clone(),
            rows: *rows,
        })
        .collect();
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Result set of a generated query, NULLs shown as empty cells
pub fn rows_table(columns: &[String], rows: &[Vec<Value>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(columns.iter().cloned());
    for row in rows {
        builder.push_record(row.iter().map(|v| match v {
            Value::Null => String::new(),
            other => other.to_string(),
        }));
    }
    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_table_skips_empty() {
        let counts = vec![("files".to_string(), 3), ("refs".to_string(), 0)];
        let table = counts_table(&counts, false);
        assert!(table.contains("files"));
        assert!(!table.contains("refs"));
        assert!(counts_table(&counts, true).contains("refs"));
        assert!(counts_table(&[], false).is_empty());
    }

    #[test]
    fn test_rows_table() {
        let table = rows_table(
            &["path".to_string(), "end_line".to_string()],
            &[vec![Value::from("a.py"), Value::Null]],
        );
        assert!(table.contains("path"));
        assert!(table.contains("a.py"));
        assert!(!table.contains("NULL"));
    }
}

//! Query builder
//!
//! Provides the two read entry points:
//! - `build_select` for a single table or unified view
//! - `build_join` for a base table joined to one related table, with the
//!   predicate taken from the contract's foreign keys when not given
//!
//! Unknown identifiers fail immediately with `Error::QueryContract`.

use super::filter::{Filter, OrderBy};
use super::Query;
use crate::schema::{SchemaRegistry, TableSchema};
use crate::value::Value;
use crate::{Error, Result};

/// Words a generated alias must not spell
const SQL_KEYWORDS: &[&str] = &[
    "add", "all", "and", "as", "asc", "by", "case", "cast", "do", "end", "for", "from", "if", "in",
    "is", "join", "key", "no", "not", "of", "on", "or", "row", "set", "to",
];

const CONCAT_SEPARATOR: &str = "|";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// `GROUP_CONCAT(col, '|')`
    Concat,
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    fn render(self, column_sql: &str) -> String {
        match self {
            Aggregate::Concat => format!("GROUP_CONCAT({column_sql}, '{CONCAT_SEPARATOR}')"),
            Aggregate::Count => format!("COUNT({column_sql})"),
            Aggregate::Sum => format!("SUM({column_sql})"),
            Aggregate::Avg => format!("AVG({column_sql})"),
            Aggregate::Min => format!("MIN({column_sql})"),
            Aggregate::Max => format!("MAX({column_sql})"),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Aggregate::Concat => "concat",
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
            Aggregate::Avg => "avg",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinKind {
    #[default]
    Left,
    Inner,
    Right,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// Description of a two-table join.
///
/// Column references in filters, grouping and ordering are either a bare
/// base-table column or `table.column` naming either side. The generated
/// aliases (`fi.path`, `sy.name`) qualify too; a self-join needs the join
/// alias for its joined side.
#[derive(Debug, Clone, Default)]
pub struct JoinSpec {
    pub base: String,
    pub join_table: String,
    /// Empty selects every base column in declared order
    pub base_columns: Vec<String>,
    pub join_columns: Vec<String>,
    /// `(base column, join column)` pairs; derived from foreign keys when absent
    pub join_on: Option<Vec<(String, String)>>,
    /// Aggregated join-side columns
    pub aggregates: Vec<(String, Aggregate)>,
    pub filters: Vec<Filter>,
    /// Empty groups by every plain selected column when aggregating
    pub group_by: Vec<String>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
    pub kind: JoinKind,
}

impl JoinSpec {
    pub fn new(base: &str, join_table: &str) -> Self {
        Self {
            base: base.to_string(),
            join_table: join_table.to_string(),
            ..Default::default()
        }
    }

    pub fn base_columns(mut self, columns: &[&str]) -> Self {
        self.base_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn join_columns(mut self, columns: &[&str]) -> Self {
        self.join_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn on(mut self, pairs: &[(&str, &str)]) -> Self {
        self.join_on = Some(
            pairs
                .iter()
                .map(|(b, j)| (b.to_string(), j.to_string()))
                .collect(),
        );
        self
    }

    pub fn aggregate(mut self, column: &str, aggregate: Aggregate) -> Self {
        self.aggregates.push((column.to_string(), aggregate));
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Builds SELECT statements against the contract
pub struct QueryBuilder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// SELECT from one table or unified view.
    ///
    /// `columns: None` selects every column in declared order, so callers can
    /// unpack rows positionally.
    pub fn build_select(
        &self,
        table: &str,
        columns: Option<&[&str]>,
        filters: &[Filter],
        order_by: &[OrderBy],
        limit: Option<usize>,
    ) -> Result<Query> {
        let known = self.relation_columns(table)?;
        let check = |col: &str| -> Result<String> {
            if known.iter().any(|k| k == col) {
                Ok(col.to_string())
            } else {
                Err(unknown_column(table, col))
            }
        };

        let selected: Vec<String> = match columns {
            Some(cols) if !cols.is_empty() => cols.iter().map(|c| check(*c)).collect::<Result<_>>()?,
            _ => known.clone(),
        };

        let mut params = Vec::new();
        let mut sql = format!("SELECT {} FROM {table}", selected.join(", "));
        push_where(&mut sql, filters, &mut params, |f| check(&f.column))?;
        let orders = order_by
            .iter()
            .map(|o| Ok(format!("{} {}", check(&o.column)?, o.direction())))
            .collect::<Result<Vec<_>>>()?;
        push_tail(&mut sql, &[], &orders, limit);

        Ok(Query {
            sql,
            params,
            columns: selected,
        })
    }

    /// Join `spec.join_table` onto `spec.base`.
    ///
    /// Without an explicit `join_on` the join table must declare exactly one
    /// foreign key to the base table.
    pub fn build_join(&self, spec: &JoinSpec) -> Result<Query> {
        let base = self.table(&spec.base)?;
        let joined = self.table(&spec.join_table)?;
        let (ba, ja) = aliases(&base.name, &joined.name);
        let sides = Sides {
            base,
            joined,
            base_alias: &ba,
            join_alias: &ja,
        };

        let predicate = self
            .join_pairs(spec, base, joined)?
            .iter()
            .map(|(b, j)| format!("{ba}.{b} = {ja}.{j}"))
            .collect::<Vec<_>>()
            .join(" AND ");

        let mut select = Vec::new();
        let mut labels = Vec::new();
        let mut plain = Vec::new();

        let base_columns: Vec<String> = if spec.base_columns.is_empty() {
            base.column_names().into_iter().map(str::to_string).collect()
        } else {
            spec.base_columns.clone()
        };
        for col in &base_columns {
            let expr = sides.column_in(base, &ba, col)?;
            select.push(expr.clone());
            plain.push(expr);
            labels.push(col.clone());
        }
        for col in &spec.join_columns {
            let expr = sides.column_in(joined, &ja, col)?;
            let label = if labels.contains(col) {
                format!("{}_{col}", joined.name)
            } else {
                col.clone()
            };
            select.push(if &label == col {
                expr.clone()
            } else {
                format!("{expr} AS {label}")
            });
            plain.push(expr);
            labels.push(label);
        }
        for (col, aggregate) in &spec.aggregates {
            let expr = sides.column_in(joined, &ja, col)?;
            let label = format!("{col}_{}", aggregate.suffix());
            select.push(format!("{} AS {label}", aggregate.render(&expr)));
            labels.push(label);
        }

        let mut params = Vec::new();
        let mut sql = format!(
            "SELECT {} FROM {} {ba} {} {} {ja} ON {predicate}",
            select.join(", "),
            base.name,
            spec.kind.as_sql(),
            joined.name,
        );
        push_where(&mut sql, &spec.filters, &mut params, |f| sides.resolve(&f.column))?;

        let group_by: Vec<String> = if !spec.group_by.is_empty() {
            spec.group_by
                .iter()
                .map(|c| sides.resolve(c))
                .collect::<Result<_>>()?
        } else if !spec.aggregates.is_empty() {
            plain
        } else {
            Vec::new()
        };
        let orders = spec
            .order_by
            .iter()
            .map(|o| Ok(format!("{} {}", sides.resolve(&o.column)?, o.direction())))
            .collect::<Result<Vec<_>>>()?;
        push_tail(&mut sql, &group_by, &orders, spec.limit);

        Ok(Query {
            sql,
            params,
            columns: labels,
        })
    }

    fn table(&self, name: &str) -> Result<&'a TableSchema> {
        self.registry
            .get(name)
            .ok_or_else(|| Error::QueryContract(format!("Unknown table '{name}'")))
    }

    /// Declared columns of a table, or of a unified view plus its mode column
    fn relation_columns(&self, name: &str) -> Result<Vec<String>> {
        if let Some(table) = self.registry.get(name) {
            return Ok(table.column_names().into_iter().map(str::to_string).collect());
        }
        if let Some(view) = self.registry.views().iter().find(|v| v.name == name) {
            let mut columns = view.columns.clone();
            columns.push(view.mode_column.clone());
            return Ok(columns);
        }
        Err(Error::QueryContract(format!("Unknown table '{name}'")))
    }

    fn join_pairs(
        &self,
        spec: &JoinSpec,
        base: &TableSchema,
        joined: &TableSchema,
    ) -> Result<Vec<(String, String)>> {
        if let Some(pairs) = &spec.join_on {
            if pairs.is_empty() {
                return Err(Error::QueryContract(format!(
                    "Empty join predicate between '{}' and '{}'",
                    base.name, joined.name
                )));
            }
            for (b, j) in pairs {
                if !base.has_column(b) {
                    return Err(unknown_column(&base.name, b));
                }
                if !joined.has_column(j) {
                    return Err(unknown_column(&joined.name, j));
                }
            }
            return Ok(pairs.clone());
        }

        let candidates: Vec<_> = joined.references(&base.name).collect();
        match candidates.as_slice() {
            [fk] => Ok(fk
                .pairs()
                .map(|(foreign, local)| (foreign.to_string(), local.to_string()))
                .collect()),
            [] => Err(Error::QueryContract(format!(
                "No foreign key on '{}' references '{}'; pass the join columns explicitly",
                joined.name, base.name
            ))),
            many => Err(Error::QueryContract(format!(
                "{} foreign keys on '{}' reference '{}' ({}); pass the join columns explicitly",
                many.len(),
                joined.name,
                base.name,
                many.iter()
                    .map(|fk| fk.local_columns.join(", "))
                    .collect::<Vec<_>>()
                    .join("; ")
            ))),
        }
    }
}

/// Both sides of a join with their aliases, for resolving column references
struct Sides<'s> {
    base: &'s TableSchema,
    joined: &'s TableSchema,
    base_alias: &'s str,
    join_alias: &'s str,
}

impl Sides<'_> {
    fn column_in(&self, table: &TableSchema, alias: &str, col: &str) -> Result<String> {
        if table.has_column(col) {
            Ok(format!("{alias}.{col}"))
        } else {
            Err(unknown_column(&table.name, col))
        }
    }

    /// `col` on the base table, or `qualifier.col` on either side. Aliases
    /// are checked before table names, so a self-join reaches its joined
    /// side through the join alias while the table name means the base.
    fn resolve(&self, reference: &str) -> Result<String> {
        match reference.split_once('.') {
            None => self.column_in(self.base, self.base_alias, reference),
            Some((alias, col)) if alias == self.join_alias => {
                self.column_in(self.joined, self.join_alias, col)
            }
            Some((alias, col)) if alias == self.base_alias => {
                self.column_in(self.base, self.base_alias, col)
            }
            Some((table, col)) if table == self.base.name => {
                self.column_in(self.base, self.base_alias, col)
            }
            Some((table, col)) if table == self.joined.name => {
                self.column_in(self.joined, self.join_alias, col)
            }
            Some((table, _)) => Err(Error::QueryContract(format!(
                "Column reference '{reference}' names table '{table}', which is not part of the join"
            ))),
        }
    }
}

fn unknown_column(table: &str, col: &str) -> Error {
    Error::QueryContract(format!("Unknown column '{col}' in table '{table}'"))
}

fn push_where<F>(sql: &mut String, filters: &[Filter], params: &mut Vec<Value>, column: F) -> Result<()>
where
    F: Fn(&Filter) -> Result<String>,
{
    if filters.is_empty() {
        return Ok(());
    }
    let clauses = filters
        .iter()
        .map(|f| Ok(f.render(&column(f)?, params)))
        .collect::<Result<Vec<_>>>()?;
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
    Ok(())
}

fn push_tail(sql: &mut String, group_by: &[String], orders: &[String], limit: Option<usize>) {
    if !group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&group_by.join(", "));
    }
    if !orders.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&orders.join(", "));
    }
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {n}"));
    }
}

/// Short alias from word initials (`cfg_blocks` -> `cb`); single words take
/// their first two letters (`files` -> `fi`)
fn alias_for(table: &str) -> String {
    let words: Vec<&str> = table.split('_').filter(|w| !w.is_empty()).collect();
    let alias: String = if words.len() > 1 {
        words.iter().filter_map(|w| w.chars().next()).collect()
    } else {
        table.chars().take(2).collect()
    };
    let alias = alias.to_lowercase();
    if SQL_KEYWORDS.contains(&alias.as_str()) {
        format!("{alias}_")
    } else {
        alias
    }
}

fn aliases(base: &str, joined: &str) -> (String, String) {
    let base_alias = alias_for(base);
    let mut join_alias = alias_for(joined);
    if join_alias == base_alias {
        join_alias.push('2');
    }
    (base_alias, join_alias)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{row, Database};

    fn seeded(registry: &SchemaRegistry) -> Database<'_> {
        let mut db = Database::open_in_memory(registry).unwrap();
        db.stage("files", row!["a.py", "h1", "py", 10, 1]).unwrap();
        db.stage("files", row!["b.py", "h2", "py", 20, 2]).unwrap();
        db.stage("files", row!["c.py", "h3", "py", 30, 3]).unwrap();
        db.stage("symbols", row!["a.py", "foo", "function", 1, 0]).unwrap();
        db.stage("symbols", row!["a.py", "Bar", "class", 5, 0]).unwrap();
        db.stage("symbols", row!["b.py", "baz", "function", 2, 4]).unwrap();
        db.flush().unwrap();
        db
    }

    #[test]
    fn test_aliases() {
        assert_eq!(alias_for("cfg_blocks"), "cb");
        assert_eq!(alias_for("files"), "fi");
        assert_eq!(alias_for("graphql_field_args"), "gfa");
        assert_eq!(alias_for("import_styles"), "is_");
        assert_eq!(alias_for("assignment_sources"), "as_");
        assert_eq!(aliases("cfg_blocks", "cfg_blocks"), ("cb".to_string(), "cb2".to_string()));
        assert_eq!(
            aliases("symbols", "symbols_jsx"),
            ("sy".to_string(), "sj".to_string())
        );
    }

    #[test]
    fn test_select_defaults_to_declared_order() {
        let registry = SchemaRegistry::builtin().unwrap();
        let query = QueryBuilder::new(&registry)
            .build_select("refs", None, &[], &[], None)
            .unwrap();
        assert_eq!(query.sql, "SELECT src, kind, value, line FROM refs");
        assert_eq!(query.columns, vec!["src", "kind", "value", "line"]);
    }

    #[test]
    fn test_select_with_filters_order_and_limit() {
        let registry = SchemaRegistry::builtin().unwrap();
        let db = seeded(&registry);
        let query = QueryBuilder::new(&registry)
            .build_select(
                "symbols",
                Some(&["name", "line"]),
                &[Filter::eq("type", "function"), Filter::like("path", "%.py")],
                &[OrderBy::desc("line")],
                Some(10),
            )
            .unwrap();
        assert_eq!(
            query.sql,
            "SELECT name, line FROM symbols WHERE type = ? AND path LIKE ? ORDER BY line DESC LIMIT 10"
        );
        assert_eq!(db.fetch(&query).unwrap(), vec![row!["baz", 2], row!["foo", 1]]);
    }

    #[test]
    fn test_select_from_unified_view() {
        let registry = SchemaRegistry::builtin().unwrap();
        let db = seeded(&registry);
        let query = QueryBuilder::new(&registry)
            .build_select("symbols_unified", Some(&["name", "jsx_mode"]), &[], &[OrderBy::asc("name")], None)
            .unwrap();
        assert_eq!(
            db.fetch(&query).unwrap(),
            vec![
                row!["Bar", "transformed"],
                row!["baz", "transformed"],
                row!["foo", "transformed"]
            ]
        );
    }

    #[test]
    fn test_unknown_identifiers_rejected() {
        let registry = SchemaRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);

        let err = builder.build_select("nope", None, &[], &[], None).unwrap_err();
        assert!(matches!(err, Error::QueryContract(_)));

        let err = builder
            .build_select("symbols", Some(&["name; DROP TABLE files"]), &[], &[], None)
            .unwrap_err();
        assert!(matches!(err, Error::QueryContract(_)));

        assert!(builder
            .build_select("symbols", None, &[Filter::eq("bogus", 1)], &[], None)
            .is_err());
        assert!(builder
            .build_select("symbols", None, &[], &[OrderBy::asc("bogus")], None)
            .is_err());

        let join = JoinSpec::new("files", "symbols").filter(Filter::eq("refs.src", "a.py"));
        assert!(matches!(builder.build_join(&join), Err(Error::QueryContract(_))));
    }

    #[test]
    fn test_inferred_join_matches_explicit_join() {
        let registry = SchemaRegistry::builtin().unwrap();
        let db = seeded(&registry);
        let builder = QueryBuilder::new(&registry);

        let inferred = JoinSpec::new("files", "symbols")
            .base_columns(&["path"])
            .join_columns(&["name"])
            .order_by(OrderBy::asc("path"))
            .order_by(OrderBy::asc("symbols.name"));
        let explicit = inferred.clone().on(&[("path", "path")]);

        let a = builder.build_join(&inferred).unwrap();
        let b = builder.build_join(&explicit).unwrap();
        assert!(a.sql.contains("FROM files fi LEFT JOIN symbols sy ON fi.path = sy.path"));
        assert_eq!(a.sql, b.sql);

        let rows = db.fetch(&a).unwrap();
        assert_eq!(rows, db.fetch(&b).unwrap());
        assert_eq!(
            rows,
            vec![
                row!["a.py", "Bar"],
                row!["a.py", "foo"],
                row!["b.py", "baz"],
                vec![Value::from("c.py"), Value::Null],
            ]
        );
    }

    #[test]
    fn test_join_aggregates_group_by_selected_columns() {
        let registry = SchemaRegistry::builtin().unwrap();
        let db = seeded(&registry);
        let query = QueryBuilder::new(&registry)
            .build_join(
                &JoinSpec::new("files", "symbols")
                    .base_columns(&["path"])
                    .aggregate("name", Aggregate::Count)
                    .aggregate("line", Aggregate::Max)
                    .kind(JoinKind::Inner)
                    .order_by(OrderBy::asc("path")),
            )
            .unwrap();
        assert_eq!(query.columns, vec!["path", "name_count", "line_max"]);
        assert!(query.sql.contains("GROUP BY fi.path"));
        assert_eq!(db.fetch(&query).unwrap(), vec![row!["a.py", 2, 5], row!["b.py", 1, 2]]);

        let concat = QueryBuilder::new(&registry)
            .build_join(
                &JoinSpec::new("files", "symbols")
                    .base_columns(&["path"])
                    .aggregate("type", Aggregate::Concat)
                    .kind(JoinKind::Inner)
                    .filter(Filter::eq("path", "b.py")),
            )
            .unwrap();
        assert!(concat.sql.contains("GROUP_CONCAT(sy.type, '|') AS type_concat"));
        assert_eq!(db.fetch(&concat).unwrap(), vec![row!["b.py", "function"]]);
    }

    #[test]
    fn test_join_without_single_candidate_fk_rejected() {
        let registry = SchemaRegistry::builtin().unwrap();
        let builder = QueryBuilder::new(&registry);

        let err = builder.build_join(&JoinSpec::new("cfg_blocks", "cfg_edges")).unwrap_err();
        assert!(err.to_string().contains("2 foreign keys on 'cfg_edges'"), "{err}");

        let err = builder
            .build_join(&JoinSpec::new("github_jobs", "github_job_dependencies"))
            .unwrap_err();
        assert!(matches!(err, Error::QueryContract(_)));

        let err = builder.build_join(&JoinSpec::new("files", "react_components")).unwrap_err();
        assert!(err.to_string().contains("No foreign key"), "{err}");

        let explicit = JoinSpec::new("cfg_blocks", "cfg_edges").on(&[("id", "source_block_id")]);
        let query = builder.build_join(&explicit).unwrap();
        assert!(query.sql.contains("ON cb.id = ce.source_block_id"));
    }

    #[test]
    fn test_join_label_collisions_are_qualified() {
        let registry = SchemaRegistry::builtin().unwrap();
        let query = QueryBuilder::new(&registry)
            .build_join(
                &JoinSpec::new("files", "refs")
                    .base_columns(&["path"])
                    .join_columns(&["kind", "line"])
                    .on(&[("path", "src")]),
            )
            .unwrap();
        assert_eq!(query.columns, vec!["path", "kind", "line"]);

        let query = QueryBuilder::new(&registry)
            .build_join(
                &JoinSpec::new("files", "symbols")
                    .base_columns(&["path"])
                    .join_columns(&["path", "name"]),
            )
            .unwrap();
        assert_eq!(query.columns, vec!["path", "symbols_path", "name"]);
        assert!(query.sql.starts_with("SELECT fi.path, sy.path AS symbols_path, sy.name"));
    }

    #[test]
    fn test_self_join_resolves_join_alias() {
        let registry = SchemaRegistry::builder()
            .partition(
                "core",
                vec![
                    TableSchema::new("nodes")
                        .column(crate::Column::identity("id"))
                        .column(crate::Column::text("name").not_null())
                        .column(crate::Column::integer("parent_id"))
                        .foreign_key(&["parent_id"], "nodes", &["id"]),
                ],
            )
            .flush("nodes", crate::InsertMode::Insert)
            .build()
            .unwrap();
        let mut db = Database::open_in_memory(&registry).unwrap();
        db.stage("nodes", row!["root", None::<i64>]).unwrap();
        db.stage("nodes", row!["leaf", 1]).unwrap();
        db.stage("nodes", row!["twig", 1]).unwrap();
        db.flush().unwrap();

        let query = QueryBuilder::new(&registry)
            .build_join(
                &JoinSpec::new("nodes", "nodes")
                    .base_columns(&["name"])
                    .join_columns(&["name"])
                    .kind(JoinKind::Inner)
                    .filter(Filter::eq("no_2.name", "leaf"))
                    .order_by(OrderBy::asc("nodes.name")),
            )
            .unwrap();
        assert!(query.sql.contains("FROM nodes no_ INNER JOIN nodes no_2 ON no_.id = no_2.parent_id"));
        assert!(query.sql.contains("WHERE no_2.name = ?"), "{}", query.sql);
        assert!(query.sql.ends_with("ORDER BY no_.name ASC"), "{}", query.sql);
        assert_eq!(query.columns, vec!["name", "nodes_name"]);
        assert_eq!(db.fetch(&query).unwrap(), vec![row!["root", "leaf"]]);
    }
}

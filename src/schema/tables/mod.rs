//! The shipped table set, its flush order and its unified views
//!
//! This is a subset of the full fact contract. Further tables of the same
//! families go into the matching partition, with `EXPECTED_TABLE_COUNT`
//! raised to match.

mod common;
mod graphql;
mod infrastructure;
mod node;
mod python;
mod security;

use super::registry::InsertMode::{self, Insert, InsertOrIgnore, InsertOrReplace};
use super::registry::SchemaRegistry;
use super::table::UnifiedView;
use crate::Result;

/// Merged table count across every partition. Adding or removing a table
/// means updating this number in the same change.
pub const EXPECTED_TABLE_COUNT: usize = 74;

/// Tables written outside the flush cycle
pub const EXTERNAL_TABLES: &[&str] = &["findings_consolidated"];

/// Parents before children. Placeholder parents (`cfg_blocks`,
/// `graphql_types`, ...) precede every table that references them.
pub const FLUSH_ORDER: &[(&str, InsertMode)] = &[
    // core
    ("files", InsertOrReplace),
    ("config_files", InsertOrReplace),
    ("refs", Insert),
    ("symbols", Insert),
    ("symbol_parameters", Insert),
    ("symbols_jsx", InsertOrReplace),
    ("assignments", Insert),
    ("assignment_sources", Insert),
    ("assignments_jsx", InsertOrReplace),
    ("assignment_sources_jsx", Insert),
    ("function_call_args", Insert),
    ("function_call_args_jsx", InsertOrReplace),
    ("function_returns", Insert),
    ("function_return_sources", Insert),
    ("function_returns_jsx", InsertOrReplace),
    ("function_return_sources_jsx", Insert),
    ("variable_usage", Insert),
    ("object_literals", Insert),
    ("cfg_blocks", Insert),
    ("cfg_edges", Insert),
    ("cfg_block_statements", Insert),
    ("cfg_blocks_jsx", Insert),
    ("cfg_edges_jsx", Insert),
    ("cfg_block_statements_jsx", Insert),
    // security
    ("api_endpoints", Insert),
    ("api_endpoint_controls", Insert),
    ("sql_objects", Insert),
    ("sql_queries", Insert),
    ("sql_query_tables", Insert),
    ("jwt_patterns", Insert),
    ("env_var_usage", InsertOrIgnore),
    // node
    ("class_properties", InsertOrIgnore),
    ("react_components", Insert),
    ("react_component_hooks", Insert),
    ("react_hooks", Insert),
    ("react_hook_dependencies", Insert),
    ("vue_components", Insert),
    ("vue_hooks", Insert),
    ("vue_directives", Insert),
    ("vue_provide_inject", Insert),
    ("type_annotations", InsertOrIgnore),
    ("package_configs", InsertOrReplace),
    ("package_dependencies", InsertOrReplace),
    ("lock_analysis", InsertOrReplace),
    ("import_styles", InsertOrIgnore),
    ("import_style_names", Insert),
    ("frameworks", Insert),
    ("framework_safe_sinks", Insert),
    ("validation_framework_usage", Insert),
    // python
    ("python_orm_models", Insert),
    ("python_orm_fields", Insert),
    ("python_routes", Insert),
    ("python_blueprints", Insert),
    ("python_validators", Insert),
    ("python_decorators", InsertOrIgnore),
    // infrastructure
    ("docker_images", InsertOrReplace),
    ("docker_image_ports", InsertOrIgnore),
    ("compose_services", InsertOrReplace),
    ("nginx_configs", InsertOrReplace),
    ("terraform_files", InsertOrReplace),
    ("terraform_resources", InsertOrReplace),
    ("terraform_variables", InsertOrReplace),
    ("github_workflows", InsertOrReplace),
    ("github_jobs", InsertOrReplace),
    ("github_job_dependencies", InsertOrIgnore),
    ("github_steps", InsertOrReplace),
    ("github_step_outputs", Insert),
    ("github_step_references", Insert),
    // graphql
    ("graphql_schemas", InsertOrReplace),
    ("graphql_types", Insert),
    ("graphql_fields", Insert),
    ("graphql_field_args", Insert),
    ("graphql_resolver_mappings", InsertOrIgnore),
];

fn views() -> Vec<UnifiedView> {
    vec![
        UnifiedView::new(
            "symbols_unified",
            "symbols",
            "symbols_jsx",
            &["path", "name", "type", "line", "col"],
        ),
        UnifiedView::new(
            "function_returns_unified",
            "function_returns",
            "function_returns_jsx",
            &["file", "line", "function_name", "return_expr", "has_jsx", "returns_component"],
        ),
        UnifiedView::new(
            "assignments_unified",
            "assignments",
            "assignments_jsx",
            &["file", "line", "target_var", "source_expr", "in_function", "property_path"],
        ),
    ]
}

impl SchemaRegistry {
    /// The shipped registry.
    ///
    /// # Errors
    ///
    /// `SchemaContract` if the partitions, flush order or views disagree.
    pub fn builtin() -> Result<Self> {
        let mut builder = SchemaRegistry::builder()
            .partition("core", common::tables())
            .partition("security", security::tables())
            .partition("node", node::tables())
            .partition("python", python::tables())
            .partition("infrastructure", infrastructure::tables())
            .partition("graphql", graphql::tables())
            .flush_order(FLUSH_ORDER)
            .expect_tables(EXPECTED_TABLE_COUNT);
        for table in EXTERNAL_TABLES {
            builder = builder.external(table);
        }
        for view in views() {
            builder = builder.view(view);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_builtin_registry_is_consistent() {
        let registry = SchemaRegistry::builtin().unwrap();
        assert_eq!(registry.len(), EXPECTED_TABLE_COUNT);
        assert!(registry.validate().is_empty());
    }

    #[test]
    fn test_partition_sizes_add_up() {
        let sizes = [
            ("core", common::tables().len()),
            ("security", security::tables().len()),
            ("node", node::tables().len()),
            ("python", python::tables().len()),
            ("infrastructure", infrastructure::tables().len()),
            ("graphql", graphql::tables().len()),
        ];
        assert!(sizes.iter().all(|(_, n)| *n > 0));
        assert_eq!(sizes.iter().map(|(_, n)| n).sum::<usize>(), EXPECTED_TABLE_COUNT);
    }

    #[test]
    fn test_every_table_creates_and_validates_clean() {
        let registry = SchemaRegistry::builtin().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        for table in registry.tables() {
            conn.execute_batch(&table.create_table_sql())
                .unwrap_or_else(|e| panic!("{}: {e}", table.name));
            for sql in table.create_indexes_sql() {
                conn.execute_batch(&sql).unwrap();
            }
            let mismatches = table.validate_against_db(&conn);
            assert!(mismatches.is_empty(), "{}: {mismatches:?}", table.name);
        }
        for view in registry.views() {
            conn.execute_batch(&view.create_view_sql()).unwrap();
        }
    }

    #[test]
    fn test_flush_order_puts_parents_first() {
        let registry = SchemaRegistry::builtin().unwrap();
        for (position, entry) in registry.flush_order().iter().enumerate() {
            let table = registry.get(&entry.table).unwrap();
            for fk in &table.foreign_keys {
                if let Some(parent) = registry.flush_position(&fk.foreign_table) {
                    assert!(parent < position, "{} flushed before {}", table.name, fk.foreign_table);
                }
            }
        }
    }

    #[test]
    fn test_identity_parents_and_children() {
        let registry = SchemaRegistry::builtin().unwrap();
        let parents: Vec<&str> = registry
            .tables()
            .filter(|t| t.assigns_identities)
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(
            parents,
            vec!["cfg_blocks", "cfg_blocks_jsx", "frameworks", "graphql_types", "graphql_fields"]
        );
        assert_eq!(
            registry.placeholder_children("cfg_blocks"),
            vec!["cfg_edges", "cfg_block_statements"]
        );
        assert_eq!(
            registry.placeholder_children("graphql_fields"),
            vec!["graphql_field_args", "graphql_resolver_mappings"]
        );
    }
}

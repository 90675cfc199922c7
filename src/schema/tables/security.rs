//! Cross-language security patterns: endpoints, SQL, JWT, environment access

use crate::schema::{Column, TableSchema};

pub fn tables() -> Vec<TableSchema> {
    vec![
        TableSchema::new("api_endpoints")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("method").not_null(),
                Column::text("pattern").not_null(),
                Column::text("path"),
                Column::boolean("has_auth").with_default("0"),
                Column::text("handler_function"),
            ])
            .unique(&["file", "line"])
            .index("idx_api_endpoints_file", &["file"]),
        TableSchema::new("api_endpoint_controls")
            .columns([
                Column::identity("id"),
                Column::text("endpoint_file").not_null(),
                Column::integer("endpoint_line").not_null(),
                Column::text("control_name").not_null(),
            ])
            .index("idx_api_endpoint_controls_endpoint", &["endpoint_file", "endpoint_line"])
            .index("idx_api_endpoint_controls_control", &["control_name"])
            .foreign_key(&["endpoint_file", "endpoint_line"], "api_endpoints", &["file", "line"]),
        TableSchema::new("sql_objects")
            .columns([
                Column::text("file").not_null(),
                Column::text("kind").not_null(),
                Column::text("name").not_null(),
            ])
            .index("idx_sql_file", &["file"]),
        TableSchema::new("sql_queries")
            .columns([
                Column::text("file_path").not_null(),
                Column::integer("line_number").not_null(),
                Column::text("query_text").not_null(),
                Column::text("command").not_null().check("command != 'UNKNOWN'"),
                Column::text("extraction_source").not_null().with_default("'code_execute'"),
            ])
            .primary_key(&["file_path", "line_number"])
            .index("idx_sql_queries_file", &["file_path"])
            .index("idx_sql_queries_command", &["command"]),
        TableSchema::new("sql_query_tables")
            .columns([
                Column::identity("id"),
                Column::text("query_file").not_null(),
                Column::integer("query_line").not_null(),
                Column::text("table_name").not_null(),
            ])
            .index("idx_sql_query_tables_query", &["query_file", "query_line"])
            .index("idx_sql_query_tables_table", &["table_name"])
            .foreign_key(
                &["query_file", "query_line"],
                "sql_queries",
                &["file_path", "line_number"],
            ),
        TableSchema::new("jwt_patterns")
            .columns([
                Column::text("file_path").not_null(),
                Column::integer("line_number").not_null(),
                Column::text("pattern_type").not_null(),
                Column::text("pattern_text"),
                Column::text("secret_source"),
                Column::text("algorithm"),
            ])
            .index("idx_jwt_file", &["file_path"])
            .index("idx_jwt_type", &["pattern_type"]),
        TableSchema::new("env_var_usage")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("var_name").not_null(),
                Column::text("access_type").not_null(),
                Column::text("in_function"),
                Column::text("property_access"),
            ])
            .primary_key(&["file", "line", "var_name", "access_type"])
            .index("idx_env_var_usage_file", &["file"])
            .index("idx_env_var_usage_name", &["var_name"]),
    ]
}

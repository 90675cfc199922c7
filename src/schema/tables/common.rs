//! Core tables shared by every language: files, symbols, data flow, CFG, findings

use crate::schema::{Column, TableSchema};

/// Columns common to the syntax-preserving variants of dual-pass tables
fn jsx_columns(default_pass: &str) -> [Column; 2] {
    [
        Column::text("jsx_mode").not_null().with_default("'preserved'"),
        Column::integer("extraction_pass").with_default(default_pass),
    ]
}

pub fn tables() -> Vec<TableSchema> {
    vec![
        // ========== File tracking ==========
        TableSchema::new("files").columns([
            Column::text("path").primary_key(),
            Column::text("sha256").not_null(),
            Column::text("ext").not_null(),
            Column::integer("bytes").not_null(),
            Column::integer("loc").not_null(),
            Column::text("file_category").not_null().with_default("'source'"),
        ]),
        TableSchema::new("config_files").columns([
            Column::text("path").primary_key(),
            Column::text("content").not_null(),
            Column::text("type").not_null(),
            Column::text("context_dir"),
        ]),
        TableSchema::new("refs")
            .columns([
                Column::text("src").not_null(),
                Column::text("kind").not_null(),
                Column::text("value").not_null(),
                Column::integer("line"),
            ])
            .index("idx_refs_src", &["src"])
            .foreign_key(&["src"], "files", &["path"]),
        // ========== Symbols ==========
        TableSchema::new("symbols")
            .columns([
                Column::text("path").not_null(),
                Column::text("name").not_null(),
                Column::text("type").not_null(),
                Column::integer("line").not_null(),
                Column::integer("col").not_null(),
                Column::integer("end_line"),
                Column::text("type_annotation"),
                Column::boolean("is_typed").with_default("0"),
            ])
            .primary_key(&["path", "name", "line", "type", "col"])
            .index("idx_symbols_path", &["path"])
            .index("idx_symbols_type", &["type"])
            .index("idx_symbols_name", &["name"])
            .foreign_key(&["path"], "files", &["path"]),
        TableSchema::new("symbol_parameters")
            .columns([
                Column::identity("id"),
                Column::text("symbol_path").not_null(),
                Column::text("symbol_name").not_null(),
                Column::integer("symbol_line").not_null(),
                Column::text("symbol_type").not_null(),
                Column::integer("symbol_col").not_null(),
                Column::integer("param_index").not_null(),
                Column::text("param_name").not_null(),
            ])
            .index("idx_symbol_parameters_symbol", &["symbol_path", "symbol_name", "symbol_line"])
            .index("idx_symbol_parameters_name", &["param_name"])
            .foreign_key(
                &["symbol_path", "symbol_name", "symbol_line", "symbol_type", "symbol_col"],
                "symbols",
                &["path", "name", "line", "type", "col"],
            ),
        TableSchema::new("symbols_jsx")
            .columns([
                Column::text("path").not_null(),
                Column::text("name").not_null(),
                Column::text("type").not_null(),
                Column::integer("line").not_null(),
                Column::integer("col").not_null(),
            ])
            .columns(jsx_columns("1"))
            .primary_key(&["path", "name", "line", "jsx_mode"])
            .index("idx_jsx_symbols_path", &["path"])
            .index("idx_jsx_symbols_type", &["type"]),
        // ========== Data flow ==========
        TableSchema::new("assignments")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("target_var").not_null(),
                Column::text("source_expr").not_null(),
                Column::text("in_function").not_null(),
                Column::text("property_path"),
            ])
            .primary_key(&["file", "line", "target_var"])
            .index("idx_assignments_file", &["file"])
            .index("idx_assignments_function", &["in_function"])
            .index("idx_assignments_target", &["target_var"])
            .partial_index(
                "idx_assignments_property_path",
                &["property_path"],
                "property_path IS NOT NULL",
            ),
        TableSchema::new("assignment_sources")
            .columns([
                Column::identity("id"),
                Column::text("assignment_file").not_null(),
                Column::integer("assignment_line").not_null(),
                Column::text("assignment_target").not_null(),
                Column::text("source_var_name").not_null(),
            ])
            .index(
                "idx_assignment_sources_assignment",
                &["assignment_file", "assignment_line", "assignment_target"],
            )
            .index("idx_assignment_sources_var", &["source_var_name"])
            .foreign_key(
                &["assignment_file", "assignment_line", "assignment_target"],
                "assignments",
                &["file", "line", "target_var"],
            ),
        TableSchema::new("assignments_jsx")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("target_var").not_null(),
                Column::text("source_expr").not_null(),
                Column::text("in_function").not_null(),
                Column::text("property_path"),
            ])
            .columns(jsx_columns("1"))
            .primary_key(&["file", "line", "target_var", "jsx_mode"])
            .index("idx_jsx_assignments_file", &["file"])
            .index("idx_jsx_assignments_function", &["in_function"]),
        TableSchema::new("assignment_sources_jsx")
            .columns([
                Column::identity("id"),
                Column::text("assignment_file").not_null(),
                Column::integer("assignment_line").not_null(),
                Column::text("assignment_target").not_null(),
                Column::text("jsx_mode").not_null(),
                Column::text("source_var_name").not_null(),
            ])
            .index("idx_assignment_sources_jsx_var", &["source_var_name"])
            .foreign_key(
                &["assignment_file", "assignment_line", "assignment_target", "jsx_mode"],
                "assignments_jsx",
                &["file", "line", "target_var", "jsx_mode"],
            ),
        TableSchema::new("function_call_args")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("caller_function").not_null(),
                Column::text("callee_function").not_null().check("callee_function != ''"),
                Column::integer("argument_index"),
                Column::text("argument_expr"),
                Column::text("param_name"),
                Column::text("callee_file_path"),
            ])
            .index("idx_function_call_args_file", &["file"])
            .index("idx_function_call_args_caller", &["caller_function"])
            .index("idx_function_call_args_callee", &["callee_function"])
            .index("idx_function_call_args_file_line", &["file", "line"]),
        TableSchema::new("function_call_args_jsx")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("caller_function").not_null(),
                Column::text("callee_function").not_null(),
                Column::integer("argument_index"),
                Column::text("argument_expr"),
                Column::text("param_name"),
            ])
            .columns(jsx_columns("1"))
            .primary_key(&["file", "line", "callee_function", "argument_index", "jsx_mode"])
            .index("idx_jsx_calls_file", &["file"])
            .index("idx_jsx_calls_caller", &["caller_function"]),
        TableSchema::new("function_returns")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("function_name").not_null(),
                Column::text("return_expr").not_null(),
                Column::boolean("has_jsx").with_default("0"),
                Column::boolean("returns_component").with_default("0"),
                Column::text("cleanup_operations"),
            ])
            .primary_key(&["file", "line", "function_name"])
            .index("idx_function_returns_file", &["file"])
            .index("idx_function_returns_function", &["function_name"]),
        TableSchema::new("function_return_sources")
            .columns([
                Column::identity("id"),
                Column::text("return_file").not_null(),
                Column::integer("return_line").not_null(),
                Column::text("return_function").not_null(),
                Column::text("return_var_name").not_null(),
            ])
            .index(
                "idx_function_return_sources_return",
                &["return_file", "return_line", "return_function"],
            )
            .index("idx_function_return_sources_var", &["return_var_name"])
            .foreign_key(
                &["return_file", "return_line", "return_function"],
                "function_returns",
                &["file", "line", "function_name"],
            ),
        TableSchema::new("function_returns_jsx")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("function_name"),
                Column::text("return_expr"),
                Column::boolean("has_jsx").with_default("0"),
                Column::boolean("returns_component").with_default("0"),
                Column::text("cleanup_operations"),
            ])
            .columns(jsx_columns("1"))
            .primary_key(&["file", "line", "jsx_mode"])
            .index("idx_jsx_returns_file", &["file"])
            .index("idx_jsx_returns_function", &["function_name"]),
        TableSchema::new("function_return_sources_jsx")
            .columns([
                Column::identity("id"),
                Column::text("return_file").not_null(),
                Column::integer("return_line").not_null(),
                Column::text("return_function"),
                Column::text("jsx_mode").not_null(),
                Column::text("return_var_name").not_null(),
            ])
            .index("idx_function_return_sources_jsx_var", &["return_var_name"])
            .foreign_key(
                &["return_file", "return_line", "jsx_mode"],
                "function_returns_jsx",
                &["file", "line", "jsx_mode"],
            ),
        TableSchema::new("variable_usage")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("variable_name").not_null(),
                Column::text("usage_type").not_null(),
                Column::text("in_component"),
                Column::text("in_hook"),
                Column::integer("scope_level"),
            ])
            .index("idx_variable_usage_file", &["file"])
            .index("idx_variable_usage_component", &["in_component"])
            .index("idx_variable_usage_var", &["variable_name"]),
        TableSchema::new("object_literals")
            .columns([
                Column::identity("id"),
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("variable_name"),
                Column::text("property_name").not_null(),
                Column::text("property_value").not_null(),
                Column::text("property_type"),
                Column::integer("nested_level").with_default("0"),
                Column::text("in_function"),
            ])
            .index("idx_object_literals_file", &["file"])
            .index("idx_object_literals_var", &["variable_name"])
            .index("idx_object_literals_value", &["property_value"]),
        // ========== Control flow graphs ==========
        TableSchema::new("cfg_blocks")
            .columns([
                Column::identity("id"),
                Column::text("file").not_null(),
                Column::text("function_name").not_null(),
                Column::text("block_type").not_null(),
                Column::integer("start_line").not_null(),
                Column::integer("end_line").not_null(),
                Column::text("condition_expr"),
            ])
            .index("idx_cfg_blocks_file", &["file"])
            .index("idx_cfg_blocks_function", &["function_name"])
            .assigns_identities(),
        TableSchema::new("cfg_edges")
            .columns([
                Column::identity("id"),
                Column::text("file").not_null(),
                Column::text("function_name").not_null(),
                Column::integer("source_block_id").not_null(),
                Column::integer("target_block_id").not_null(),
                Column::text("edge_type").not_null(),
            ])
            .index("idx_cfg_edges_file", &["file"])
            .index("idx_cfg_edges_source", &["source_block_id"])
            .index("idx_cfg_edges_target", &["target_block_id"])
            .foreign_key(&["source_block_id"], "cfg_blocks", &["id"])
            .foreign_key(&["target_block_id"], "cfg_blocks", &["id"]),
        TableSchema::new("cfg_block_statements")
            .columns([
                Column::integer("block_id").not_null(),
                Column::text("statement_type").not_null(),
                Column::integer("line").not_null(),
                Column::text("statement_text"),
            ])
            .index("idx_cfg_statements_block", &["block_id"])
            .foreign_key(&["block_id"], "cfg_blocks", &["id"]),
        TableSchema::new("cfg_blocks_jsx")
            .columns([
                Column::identity("id"),
                Column::text("file").not_null(),
                Column::text("function_name").not_null(),
                Column::text("block_type").not_null(),
                Column::integer("start_line").not_null(),
                Column::integer("end_line").not_null(),
                Column::text("condition_expr"),
            ])
            .columns(jsx_columns("2"))
            .index("idx_jsx_cfg_blocks_file", &["file"])
            .assigns_identities(),
        TableSchema::new("cfg_edges_jsx")
            .columns([
                Column::identity("id"),
                Column::text("file").not_null(),
                Column::text("function_name").not_null(),
                Column::integer("source_block_id").not_null(),
                Column::integer("target_block_id").not_null(),
                Column::text("edge_type").not_null(),
            ])
            .columns(jsx_columns("2"))
            .index("idx_jsx_cfg_edges_file", &["file"])
            .foreign_key(&["source_block_id"], "cfg_blocks_jsx", &["id"])
            .foreign_key(&["target_block_id"], "cfg_blocks_jsx", &["id"]),
        TableSchema::new("cfg_block_statements_jsx")
            .columns([
                Column::integer("block_id").not_null(),
                Column::text("statement_type").not_null(),
                Column::integer("line").not_null(),
                Column::text("statement_text"),
            ])
            .columns(jsx_columns("2"))
            .index("idx_jsx_cfg_statements_block", &["block_id"])
            .foreign_key(&["block_id"], "cfg_blocks_jsx", &["id"]),
        // ========== Findings (written outside the flush cycle) ==========
        TableSchema::new("findings_consolidated")
            .columns([
                Column::identity("id"),
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::integer("col"),
                Column::text("rule").not_null(),
                Column::text("tool").not_null(),
                Column::text("message"),
                Column::text("severity").not_null(),
                Column::text("category"),
                Column::real("confidence"),
                Column::text("code_snippet"),
                Column::text("cwe"),
                Column::text("timestamp").not_null(),
                Column::text("details_json").with_default("'{}'"),
            ])
            .index("idx_findings_file_line", &["file", "line"])
            .index("idx_findings_tool", &["tool"])
            .index("idx_findings_severity", &["severity"])
            .index("idx_findings_rule", &["rule"])
            .index("idx_findings_tool_rule", &["tool", "rule"]),
    ]
}

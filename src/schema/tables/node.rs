//! JavaScript / TypeScript tables: React, Vue, types, packages, frameworks

use crate::schema::{Column, TableSchema};

pub fn tables() -> Vec<TableSchema> {
    vec![
        TableSchema::new("class_properties")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("class_name").not_null(),
                Column::text("property_name").not_null(),
                Column::text("property_type"),
                Column::boolean("is_optional").with_default("0"),
                Column::boolean("is_readonly").with_default("0"),
                Column::text("access_modifier"),
                Column::boolean("has_declare").with_default("0"),
                Column::text("initializer"),
            ])
            .primary_key(&["file", "class_name", "property_name", "line"])
            .index("idx_class_properties_file", &["file"])
            .index("idx_class_properties_class", &["class_name"]),
        // ========== React ==========
        TableSchema::new("react_components")
            .columns([
                Column::text("file").not_null(),
                Column::text("name").not_null(),
                Column::text("type").not_null(),
                Column::integer("start_line").not_null(),
                Column::integer("end_line").not_null(),
                Column::boolean("has_jsx").with_default("0"),
                Column::text("props_type"),
            ])
            .primary_key(&["file", "name"])
            .index("idx_react_components_name", &["name"]),
        TableSchema::new("react_component_hooks")
            .columns([
                Column::identity("id"),
                Column::text("component_file").not_null(),
                Column::text("component_name").not_null(),
                Column::text("hook_name").not_null(),
            ])
            .index("idx_react_comp_hooks_component", &["component_file", "component_name"])
            .index("idx_react_comp_hooks_hook", &["hook_name"])
            .foreign_key(
                &["component_file", "component_name"],
                "react_components",
                &["file", "name"],
            ),
        TableSchema::new("react_hooks")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("component_name").not_null(),
                Column::text("hook_name").not_null(),
                Column::text("dependency_array"),
                Column::text("callback_body"),
                Column::boolean("has_cleanup").with_default("0"),
                Column::text("cleanup_type"),
            ])
            .unique(&["file", "line", "component_name"])
            .index("idx_react_hooks_file", &["file"])
            .index("idx_react_hooks_name", &["hook_name"]),
        TableSchema::new("react_hook_dependencies")
            .columns([
                Column::identity("id"),
                Column::text("hook_file").not_null(),
                Column::integer("hook_line").not_null(),
                Column::text("hook_component").not_null(),
                Column::text("dependency_name").not_null(),
            ])
            .index("idx_react_hook_deps_hook", &["hook_file", "hook_line", "hook_component"])
            .index("idx_react_hook_deps_name", &["dependency_name"])
            .foreign_key(
                &["hook_file", "hook_line", "hook_component"],
                "react_hooks",
                &["file", "line", "component_name"],
            ),
        // ========== Vue ==========
        TableSchema::new("vue_components")
            .columns([
                Column::text("file").not_null(),
                Column::text("name").not_null(),
                Column::text("type").not_null(),
                Column::integer("start_line").not_null(),
                Column::integer("end_line").not_null(),
                Column::boolean("has_template").with_default("0"),
                Column::boolean("has_style").with_default("0"),
                Column::boolean("composition_api_used").with_default("0"),
                Column::text("props_definition"),
                Column::text("emits_definition"),
            ])
            .index("idx_vue_components_file", &["file"])
            .index("idx_vue_components_name", &["name"]),
        TableSchema::new("vue_hooks")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("component_name").not_null(),
                Column::text("hook_name").not_null(),
                Column::text("hook_type").not_null(),
                Column::text("return_value"),
                Column::boolean("is_async").with_default("0"),
            ])
            .index("idx_vue_hooks_file", &["file"])
            .index("idx_vue_hooks_type", &["hook_type"]),
        TableSchema::new("vue_directives")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("directive_name").not_null(),
                Column::text("expression"),
                Column::text("in_component"),
                Column::boolean("has_key").with_default("0"),
            ])
            .index("idx_vue_directives_file", &["file"])
            .index("idx_vue_directives_name", &["directive_name"]),
        TableSchema::new("vue_provide_inject")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("component_name").not_null(),
                Column::text("operation_type").not_null(),
                Column::text("key_name").not_null(),
                Column::text("value_expr"),
                Column::boolean("is_reactive").with_default("0"),
            ])
            .index("idx_vue_provide_inject_file", &["file"]),
        // ========== TypeScript ==========
        TableSchema::new("type_annotations")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::integer("col"),
                Column::text("symbol_name").not_null(),
                Column::text("symbol_kind").not_null(),
                Column::text("type_annotation"),
                Column::boolean("is_any").with_default("0"),
                Column::boolean("is_unknown").with_default("0"),
                Column::boolean("is_generic").with_default("0"),
                Column::text("return_type"),
                Column::text("extends_type"),
            ])
            .primary_key(&["file", "line", "col", "symbol_name"])
            .index("idx_type_annotations_file", &["file"])
            .partial_index("idx_type_annotations_any", &["file", "is_any"], "is_any = 1"),
        // ========== Build analysis ==========
        TableSchema::new("package_configs").columns([
            Column::text("file_path").primary_key(),
            Column::text("package_name"),
            Column::text("version"),
            Column::boolean("private").with_default("0"),
        ]),
        TableSchema::new("package_dependencies")
            .columns([
                Column::text("file_path").not_null(),
                Column::text("name").not_null(),
                Column::text("version_spec"),
                Column::text("dependency_kind").not_null().with_default("'runtime'"),
            ])
            .primary_key(&["file_path", "name", "dependency_kind"])
            .index("idx_package_dependencies_name", &["name"])
            .foreign_key(&["file_path"], "package_configs", &["file_path"]),
        TableSchema::new("lock_analysis")
            .columns([
                Column::text("file_path").primary_key(),
                Column::text("lock_type").not_null(),
                Column::text("package_manager_version"),
                Column::integer("total_packages"),
                Column::text("lock_file_version"),
            ])
            .index("idx_lock_analysis_type", &["lock_type"]),
        TableSchema::new("import_styles")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("package").not_null(),
                Column::text("import_style").not_null(),
                Column::text("alias_name"),
                Column::text("full_statement"),
            ])
            .primary_key(&["file", "line", "package"])
            .index("idx_import_styles_package", &["package"])
            .index("idx_import_styles_style", &["import_style"]),
        TableSchema::new("import_style_names")
            .columns([
                Column::identity("id"),
                Column::text("import_file").not_null(),
                Column::integer("import_line").not_null(),
                Column::text("import_package").not_null(),
                Column::text("imported_name").not_null(),
            ])
            .index("idx_import_style_names_import", &["import_file", "import_line"])
            .index("idx_import_style_names_name", &["imported_name"])
            .foreign_key(
                &["import_file", "import_line", "import_package"],
                "import_styles",
                &["file", "line", "package"],
            ),
        // ========== Framework detection ==========
        TableSchema::new("frameworks")
            .columns([
                Column::identity("id"),
                Column::text("name").not_null(),
                Column::text("version"),
                Column::text("language").not_null(),
                Column::text("path").with_default("'.'"),
                Column::text("source"),
                Column::text("package_manager"),
                Column::boolean("is_primary").with_default("0"),
            ])
            .unique(&["name", "language", "path"])
            .assigns_identities(),
        TableSchema::new("framework_safe_sinks")
            .columns([
                Column::integer("framework_id").not_null(),
                Column::text("sink_pattern").not_null(),
                Column::text("sink_type").not_null(),
                Column::boolean("is_safe").with_default("1"),
                Column::text("reason"),
            ])
            .index("idx_framework_safe_sinks_framework", &["framework_id"])
            .foreign_key(&["framework_id"], "frameworks", &["id"]),
        TableSchema::new("validation_framework_usage")
            .columns([
                Column::text("file_path").not_null(),
                Column::integer("line").not_null(),
                Column::text("framework").not_null(),
                Column::text("method").not_null(),
                Column::text("variable_name"),
                Column::boolean("is_validator").with_default("1"),
                Column::text("argument_expr"),
            ])
            .index("idx_validation_framework_file_line", &["file_path", "line"])
            .index("idx_validation_framework_method", &["framework", "method"]),
    ]
}

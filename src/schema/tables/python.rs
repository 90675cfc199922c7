//! Python tables: ORM models, routes, decorators

use crate::schema::{Column, TableSchema};

pub fn tables() -> Vec<TableSchema> {
    vec![
        TableSchema::new("python_orm_models")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("model_name").not_null(),
                Column::text("table_name"),
                Column::text("orm_type").not_null().with_default("'sqlalchemy'"),
            ])
            .primary_key(&["file", "model_name"])
            .index("idx_python_orm_models_type", &["orm_type"]),
        TableSchema::new("python_orm_fields")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("model_name").not_null(),
                Column::text("field_name").not_null(),
                Column::text("field_type"),
                Column::boolean("is_primary_key").with_default("0"),
                Column::boolean("is_foreign_key").with_default("0"),
                Column::text("foreign_key_target"),
            ])
            .primary_key(&["file", "model_name", "field_name"])
            .index("idx_python_orm_fields_model", &["model_name"])
            .partial_index("idx_python_orm_fields_foreign", &["foreign_key_target"], "is_foreign_key = 1")
            .foreign_key(&["file", "model_name"], "python_orm_models", &["file", "model_name"]),
        TableSchema::new("python_routes")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line"),
                Column::text("framework").not_null(),
                Column::text("method"),
                Column::text("pattern"),
                Column::text("handler_function"),
                Column::boolean("has_auth").with_default("0"),
                Column::text("blueprint"),
            ])
            .index("idx_python_routes_file", &["file"])
            .index("idx_python_routes_framework", &["framework"]),
        TableSchema::new("python_blueprints")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line"),
                Column::text("blueprint_name").not_null(),
                Column::text("url_prefix"),
                Column::text("subdomain"),
            ])
            .primary_key(&["file", "blueprint_name"]),
        TableSchema::new("python_validators")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("model_name").not_null(),
                Column::text("field_name"),
                Column::text("validator_method").not_null(),
                Column::text("validator_type").not_null(),
            ])
            .index("idx_python_validators_model", &["model_name"]),
        TableSchema::new("python_decorators")
            .columns([
                Column::text("file").not_null(),
                Column::integer("line").not_null(),
                Column::text("decorator_name").not_null(),
                Column::text("decorator_type").not_null(),
                Column::text("target_type").not_null(),
                Column::text("target_name").not_null(),
                Column::boolean("is_async").with_default("0"),
            ])
            .primary_key(&["file", "line", "decorator_name", "target_name"])
            .index("idx_python_decorators_type", &["decorator_type"])
            .index("idx_python_decorators_target", &["target_name"]),
    ]
}

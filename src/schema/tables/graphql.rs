//! GraphQL tables: schemas, types, fields, arguments, resolver bindings
//!
//! Types and fields both receive store-assigned identities, so a single
//! schema file stages a two-level placeholder chain:
//! type → field → argument.

use crate::schema::{Column, TableSchema};

pub fn tables() -> Vec<TableSchema> {
    vec![
        TableSchema::new("graphql_schemas")
            .columns([
                Column::text("file_path").primary_key(),
                Column::text("schema_hash").not_null(),
                Column::text("language").not_null(),
                Column::integer("last_modified"),
            ])
            .index("idx_graphql_schemas_hash", &["schema_hash"]),
        TableSchema::new("graphql_types")
            .columns([
                Column::identity("type_id"),
                Column::text("schema_path").not_null(),
                Column::text("type_name").not_null(),
                Column::text("kind").not_null(),
                Column::text("description"),
                Column::integer("line"),
            ])
            .index("idx_graphql_types_schema", &["schema_path"])
            .index("idx_graphql_types_name", &["type_name"])
            .foreign_key(&["schema_path"], "graphql_schemas", &["file_path"])
            .assigns_identities(),
        TableSchema::new("graphql_fields")
            .columns([
                Column::identity("field_id"),
                Column::integer("type_id").not_null(),
                Column::text("field_name").not_null(),
                Column::text("return_type").not_null(),
                Column::boolean("is_list").with_default("0"),
                Column::boolean("is_nullable").with_default("1"),
                Column::integer("line"),
            ])
            .index("idx_graphql_fields_type", &["type_id"])
            .index("idx_graphql_fields_name", &["field_name"])
            .foreign_key(&["type_id"], "graphql_types", &["type_id"])
            .assigns_identities(),
        TableSchema::new("graphql_field_args")
            .columns([
                Column::integer("field_id").not_null(),
                Column::text("arg_name").not_null(),
                Column::text("arg_type").not_null(),
                Column::boolean("has_default").with_default("0"),
                Column::text("default_value"),
                Column::boolean("is_nullable").with_default("1"),
            ])
            .primary_key(&["field_id", "arg_name"])
            .index("idx_graphql_field_args_type", &["arg_type"])
            .foreign_key(&["field_id"], "graphql_fields", &["field_id"]),
        TableSchema::new("graphql_resolver_mappings")
            .columns([
                Column::integer("field_id").not_null(),
                Column::text("resolver_path").not_null(),
                Column::integer("resolver_line").not_null(),
                Column::text("resolver_language").not_null(),
                Column::text("resolver_export"),
                Column::text("binding_style").not_null(),
            ])
            .primary_key(&["field_id", "resolver_path", "resolver_line"])
            .index("idx_graphql_resolver_mappings_path", &["resolver_path"])
            .foreign_key(&["field_id"], "graphql_fields", &["field_id"]),
    ]
}

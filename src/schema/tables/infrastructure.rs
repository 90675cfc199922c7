//! Infrastructure-as-code tables: Docker, Compose, nginx, Terraform, GitHub Actions

use crate::schema::{Column, TableSchema};

pub fn tables() -> Vec<TableSchema> {
    vec![
        // ========== Containers ==========
        TableSchema::new("docker_images")
            .columns([
                Column::text("file_path").primary_key(),
                Column::text("base_image"),
                Column::text("user"),
                Column::boolean("has_healthcheck").with_default("0"),
            ])
            .index("idx_docker_images_base", &["base_image"]),
        TableSchema::new("docker_image_ports")
            .columns([
                Column::text("file_path").not_null(),
                Column::integer("port").not_null(),
                Column::text("protocol").not_null().with_default("'tcp'"),
            ])
            .primary_key(&["file_path", "port", "protocol"])
            .foreign_key(&["file_path"], "docker_images", &["file_path"]),
        TableSchema::new("compose_services")
            .columns([
                Column::text("file_path").not_null(),
                Column::text("service_name").not_null(),
                Column::text("image"),
                Column::boolean("is_privileged").with_default("0"),
                Column::text("network_mode"),
                Column::text("user"),
                Column::text("restart"),
                Column::text("command"),
                Column::text("entrypoint"),
            ])
            .primary_key(&["file_path", "service_name"])
            .partial_index(
                "idx_compose_services_privileged",
                &["file_path"],
                "is_privileged = 1",
            ),
        TableSchema::new("nginx_configs")
            .columns([
                Column::text("file_path").not_null(),
                Column::text("block_type").not_null(),
                Column::text("block_context"),
                Column::integer("level").with_default("0"),
            ])
            .primary_key(&["file_path", "block_type", "block_context"])
            .index("idx_nginx_configs_type", &["block_type"]),
        // ========== Terraform ==========
        TableSchema::new("terraform_files")
            .columns([
                Column::text("file_path").primary_key(),
                Column::text("module_name"),
                Column::text("stack_name"),
                Column::text("backend_type"),
                Column::boolean("is_module").with_default("0"),
                Column::text("module_source"),
            ])
            .index("idx_terraform_files_module", &["module_name"]),
        TableSchema::new("terraform_resources")
            .columns([
                Column::text("resource_id").primary_key(),
                Column::text("file_path").not_null(),
                Column::text("resource_type").not_null(),
                Column::text("resource_name").not_null(),
                Column::text("module_path"),
                Column::boolean("has_public_exposure").with_default("0"),
                Column::integer("line"),
            ])
            .index("idx_terraform_resources_file", &["file_path"])
            .index("idx_terraform_resources_type", &["resource_type"])
            .foreign_key(&["file_path"], "terraform_files", &["file_path"]),
        TableSchema::new("terraform_variables")
            .columns([
                Column::text("variable_id").primary_key(),
                Column::text("file_path").not_null(),
                Column::text("variable_name").not_null(),
                Column::text("variable_type"),
                Column::text("default_value"),
                Column::boolean("is_sensitive").with_default("0"),
                Column::text("description"),
                Column::integer("line"),
            ])
            .index("idx_terraform_variables_file", &["file_path"])
            .index("idx_terraform_variables_name", &["variable_name"])
            .foreign_key(&["file_path"], "terraform_files", &["file_path"]),
        // ========== GitHub Actions ==========
        TableSchema::new("github_workflows")
            .columns([
                Column::text("workflow_path").primary_key(),
                Column::text("workflow_name"),
                Column::text("on_triggers").not_null(),
                Column::text("permissions"),
                Column::text("concurrency"),
            ])
            .index("idx_github_workflows_name", &["workflow_name"]),
        TableSchema::new("github_jobs")
            .columns([
                Column::text("job_id").primary_key(),
                Column::text("workflow_path").not_null(),
                Column::text("job_key").not_null(),
                Column::text("job_name"),
                Column::text("runs_on"),
                Column::text("permissions"),
                Column::text("if_condition"),
                Column::integer("timeout_minutes"),
                Column::boolean("uses_reusable_workflow").with_default("0"),
                Column::text("reusable_workflow_path"),
            ])
            .index("idx_github_jobs_workflow", &["workflow_path"])
            .index("idx_github_jobs_key", &["job_key"])
            .foreign_key(&["workflow_path"], "github_workflows", &["workflow_path"]),
        TableSchema::new("github_job_dependencies")
            .columns([
                Column::text("job_id").not_null(),
                Column::text("needs_job_id").not_null(),
            ])
            .primary_key(&["job_id", "needs_job_id"])
            .index("idx_github_job_deps_needs", &["needs_job_id"])
            .foreign_key(&["job_id"], "github_jobs", &["job_id"])
            .foreign_key(&["needs_job_id"], "github_jobs", &["job_id"]),
        TableSchema::new("github_steps")
            .columns([
                Column::text("step_id").primary_key(),
                Column::text("job_id").not_null(),
                Column::integer("sequence_order").not_null(),
                Column::text("step_name"),
                Column::text("uses_action"),
                Column::text("uses_version"),
                Column::text("run_script"),
                Column::text("shell"),
                Column::text("if_condition"),
                Column::boolean("continue_on_error").with_default("0"),
            ])
            .index("idx_github_steps_job", &["job_id"])
            .index("idx_github_steps_sequence", &["job_id", "sequence_order"])
            .index("idx_github_steps_action", &["uses_action"])
            .foreign_key(&["job_id"], "github_jobs", &["job_id"]),
        TableSchema::new("github_step_outputs")
            .columns([
                Column::identity("id"),
                Column::text("step_id").not_null(),
                Column::text("output_name").not_null(),
                Column::text("output_expression").not_null(),
            ])
            .index("idx_github_step_outputs_step", &["step_id"])
            .foreign_key(&["step_id"], "github_steps", &["step_id"]),
        TableSchema::new("github_step_references")
            .columns([
                Column::identity("id"),
                Column::text("step_id").not_null(),
                Column::text("reference_location").not_null(),
                Column::text("reference_type").not_null(),
                Column::text("reference_path").not_null(),
            ])
            .index("idx_github_step_refs_step", &["step_id"])
            .index("idx_github_step_refs_type", &["reference_type"])
            .foreign_key(&["step_id"], "github_steps", &["step_id"]),
    ]
}

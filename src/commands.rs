use crate::{emit_success, Context};
use anyhow::Context as _;
use factstore::config::ensure_db_dir;
use factstore::ui::{self, Icons};
use factstore::{Database, Finding, QueryBuilder};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

fn open_existing<'r>(ctx: &'r Context) -> anyhow::Result<Database<'r>> {
    if !ctx.database.exists() {
        anyhow::bail!(
            "no store at {} (run `factstore init` first)",
            ctx.database.display()
        );
    }
    let mut db = Database::connect(&ctx.database, &ctx.registry)
        .with_context(|| format!("opening {}", ctx.database.display()))?;
    db.set_batch_size(ctx.batch_size);
    Ok(db)
}

/// The store file plus its WAL companions
fn remove_store(path: &Path) -> anyhow::Result<()> {
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.as_os_str().to_owned();
        file.push(suffix);
        let file = Path::new(&file);
        if file.exists() {
            std::fs::remove_file(file).with_context(|| format!("removing {}", file.display()))?;
        }
    }
    Ok(())
}

pub fn run_init(ctx: &Context, fresh: bool) -> anyhow::Result<()> {
    let start = Instant::now();
    if fresh {
        remove_store(&ctx.database)?;
    }
    ensure_db_dir(&ctx.database)?;
    let db = Database::open(&ctx.database, &ctx.registry)
        .with_context(|| format!("creating schema in {}", ctx.database.display()))?;
    let registry = db.registry();

    if ctx.output.is_human() {
        ui::header("Fact store ready");
        ui::status(Icons::DATABASE, "Database", &ctx.database.display().to_string());
        ui::summary_row("Tables", &registry.len().to_string());
        ui::summary_row("Views", &registry.views().len().to_string());
        ui::summary_row("Flush order", &format!("{} tables", registry.flush_order().len()));
        ui::summary_row("Batch size", &ctx.batch_size.to_string());
        ui::timing(&format!("{:.2?}", start.elapsed()));
    } else {
        emit_success(
            ctx.output,
            "init",
            serde_json::json!({
                "database": ctx.database.display().to_string(),
                "tables": registry.len(),
                "views": registry.views().len(),
                "fresh": fresh,
            }),
        )?;
    }
    Ok(())
}

pub fn run_check(ctx: &Context) -> anyhow::Result<ExitCode> {
    let db = open_existing(ctx)?;
    let report = db.validate();

    if ctx.output.is_human() {
        ui::success(&format!(
            "Schema contract consistent: {} tables, {} views",
            ctx.registry.len(),
            ctx.registry.views().len()
        ));
        if report.is_empty() {
            ui::success("Store matches the contract");
        } else {
            ui::section(" Drift ");
            for (relation, mismatches) in &report {
                ui::drift(relation, mismatches);
            }
            println!();
            ui::warn(&format!(
                "{} of {} relations drifted; recreate the store with `factstore init --fresh`",
                report.len(),
                ctx.registry.len() + ctx.registry.views().len()
            ));
        }
    } else {
        emit_success(
            ctx.output,
            "check",
            serde_json::json!({
                "clean": report.is_empty(),
                "drift": report,
            }),
        )?;
    }

    Ok(if report.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn run_ddl(ctx: &Context, table: Option<&str>) -> anyhow::Result<()> {
    let tables: Vec<_> = match table {
        Some(name) => vec![ctx
            .registry
            .get(name)
            .with_context(|| format!("unknown table '{name}'"))?],
        None => ctx.registry.tables().collect(),
    };

    let mut statements = Vec::new();
    for schema in tables {
        statements.push(schema.create_table_sql());
        statements.extend(schema.create_indexes_sql());
    }
    if table.is_none() {
        statements.extend(ctx.registry.views().iter().map(|v| v.create_view_sql()));
    }

    if ctx.output.is_human() {
        for statement in &statements {
            println!("{statement};");
        }
    } else {
        emit_success(ctx.output, "ddl", serde_json::json!({ "statements": statements }))?;
    }
    Ok(())
}

pub fn run_tables(ctx: &Context, all: bool) -> anyhow::Result<()> {
    let db = open_existing(ctx)?;
    let counts = db.table_counts()?;
    let total: usize = counts.iter().map(|(_, n)| n).sum();

    if ctx.output.is_human() {
        ui::header(&format!("Tables in {}", ctx.database.display()));
        let table = ui::counts_table(&counts, all);
        if table.is_empty() {
            println!("{}", ui::muted("  (every table is empty; pass --all to list them)"));
        } else {
            println!("{table}");
        }
        let non_empty = counts.iter().filter(|(_, n)| *n > 0).count();
        let summary = ui::stats_table(&[
            ("Tables", &counts.len().to_string()),
            ("Non-empty", &non_empty.to_string()),
            ("Rows", &total.to_string()),
        ]);
        println!("{summary}");
    } else {
        let map: serde_json::Map<String, serde_json::Value> = counts
            .into_iter()
            .filter(|(_, n)| all || *n > 0)
            .map(|(t, n)| (t, serde_json::Value::from(n)))
            .collect();
        emit_success(ctx.output, "tables", serde_json::json!({ "counts": map, "total": total }))?;
    }
    Ok(())
}

pub fn run_select(ctx: &Context, table: &str, columns: &[String], limit: Option<usize>) -> anyhow::Result<()> {
    let db = open_existing(ctx)?;
    let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
    let query = QueryBuilder::new(&ctx.registry).build_select(
        table,
        (!columns.is_empty()).then_some(columns.as_slice()),
        &[],
        &[],
        limit,
    )?;
    tracing::debug!(sql = %query.sql, "select");
    let rows = db.fetch(&query)?;

    if ctx.output.is_human() {
        println!("{}", ui::rows_table(&query.columns, &rows));
        println!("{}", ui::dim(&format!("{} rows", rows.len())));
    } else {
        let records: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                let record: serde_json::Map<String, serde_json::Value> = query
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|v| serde_json::to_value(v).unwrap_or_default()))
                    .collect();
                serde_json::Value::Object(record)
            })
            .collect();
        emit_success(ctx.output, "select", serde_json::json!({ "table": table, "rows": records }))?;
    }
    Ok(())
}

pub fn run_import_findings(ctx: &Context, file: &Path, tool: &str) -> anyhow::Result<()> {
    let contents =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let findings: Vec<Finding> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing findings from {}", file.display()))?;

    ensure_db_dir(&ctx.database)?;
    let mut db = Database::open(&ctx.database, &ctx.registry)?;
    db.set_batch_size(ctx.batch_size);
    let written = db.write_findings(&findings, tool)?;

    if ctx.output.is_human() {
        ui::success(&format!("Imported {written} findings from {tool}"));
        ui::summary_row("Source", &file.display().to_string());
    } else {
        emit_success(
            ctx.output,
            "import-findings",
            serde_json::json!({ "tool": tool, "written": written }),
        )?;
    }
    Ok(())
}

//! Factstore CLI - create, audit and inspect a fact store

mod commands;

use clap::{Parser, Subcommand};
use factstore::config::{self, FactstoreConfig};
use factstore::SchemaRegistry;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "factstore")]
#[command(version)]
#[command(about = "Schema-contract persistence core for static-analysis facts")]
#[command(long_about = r#"
Factstore owns the SQLite store that extractors write facts into and
analyzers read them back from:
  • Every table, key and view is generated from one schema contract
  • A live store can be audited against the contract for drift
  • Reads go through a builder that only accepts known identifiers

Example usage:
  factstore init --fresh
  factstore check
  factstore select symbols --columns path,name --limit 20
  factstore import-findings semgrep.json --tool semgrep
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./factstore.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database file (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the store and its schema
    Init {
        /// Delete an existing store first; the schema is recreated, not migrated
        #[arg(long)]
        fresh: bool,
    },

    /// Self-check the contract and audit the store for drift
    Check,

    /// Print the generated DDL
    Ddl {
        /// Only this table
        #[arg(short, long)]
        table: Option<String>,
    },

    /// List tables with row counts
    Tables {
        /// Include empty tables
        #[arg(short, long)]
        all: bool,
    },

    /// Read rows from a table or unified view
    Select {
        table: String,

        /// Comma-separated column list (defaults to every column)
        #[arg(long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Maximum number of rows
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Import tool findings from a JSON array
    ImportFindings {
        /// JSON file holding an array of findings
        file: PathBuf,

        /// Tool name recorded for findings that do not name one
        #[arg(short, long)]
        tool: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    pub fn is_human(self) -> bool {
        self == OutputMode::Human
    }
}

/// Print a JSON envelope for `command`
pub fn emit_success(output_mode: OutputMode, command: &str, data: serde_json::Value) -> anyhow::Result<()> {
    if output_mode.is_human() {
        return Ok(());
    }
    let envelope = serde_json::json!({
        "ok": true,
        "command": command,
        "data": data,
    });
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

/// Everything a command needs, resolved once from flags and config
pub struct Context {
    pub registry: SchemaRegistry,
    pub database: PathBuf,
    pub batch_size: usize,
    pub output: OutputMode,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            factstore::ui::error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let file_config = config::load_config(cli.config.as_deref())?;
    let ctx = context(&cli, file_config.as_ref())?;

    match cli.command {
        Commands::Init { fresh } => commands::run_init(&ctx, fresh)?,
        Commands::Check => return commands::run_check(&ctx),
        Commands::Ddl { table } => commands::run_ddl(&ctx, table.as_deref())?,
        Commands::Tables { all } => commands::run_tables(&ctx, all)?,
        Commands::Select { table, columns, limit } => {
            commands::run_select(&ctx, &table, &columns, limit)?
        }
        Commands::ImportFindings { file, tool } => {
            commands::run_import_findings(&ctx, &file, &tool)?
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn context(cli: &Cli, file_config: Option<&FactstoreConfig>) -> anyhow::Result<Context> {
    // An inconsistent contract must stop the process before any store is touched
    let registry = SchemaRegistry::builtin()?;

    let database = cli
        .database
        .clone()
        .or_else(|| file_config.and_then(|c| c.database.as_ref()).map(PathBuf::from))
        .unwrap_or_else(|| config::default_database_path_in(std::path::Path::new(".")));

    Ok(Context {
        registry,
        database,
        batch_size: config::resolve_batch_size(file_config),
        output: if cli.json { OutputMode::Json } else { OutputMode::Human },
    })
}

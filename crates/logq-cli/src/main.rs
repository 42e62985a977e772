//! logq CLI: run, validate, or explain a pipe query against a directory of
//! `<table>.log` files.

mod logging;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use logq_commands::command::chain;
use logq_core::config::EngineConfig;
use logq_exec::{CollectRows, JsonlRows, QueryService, RowConsumer};
use logq_io::{FileLogStorage, JsonlWriter, LookupTables, TableCatalog};

/// Sub-directory of the data directory holding `<name>.csv` lookup tables.
const LOOKUP_DIR: &str = "lookups";

#[derive(Parser)]
#[command(name = "logq", version = logq_core::VERSION)]
#[command(about = "Pipe-query engine over raw log tables", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a query and write result rows as JSON lines
    Run {
        /// Directory with <table>.log files, catalog.yaml and lookups/
        #[arg(short, long)]
        data_dir: PathBuf,

        /// Query text, e.g. "table events | search status >= 500"
        #[arg(short, long)]
        query: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a JSON run report to stderr when done
        #[arg(long)]
        report: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Check a query's syntax
    Validate {
        #[arg(short, long)]
        query: String,
    },

    /// Show the command chain a query compiles to
    Explain {
        #[arg(short, long)]
        query: String,

        /// Bind against this data directory to show headers and the
        /// timeline reporter
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Engine settings; each one overrides the environment (`LOGQ_*`).
#[derive(Args, Debug, Default, Clone)]
struct EngineArgs {
    /// Memory cap in bytes for one query
    #[arg(long)]
    mem_cap: Option<usize>,

    /// Buffer spill threshold in bytes
    #[arg(long)]
    spill_threshold: Option<usize>,

    /// Spill directory (or memory://name)
    #[arg(long)]
    spill_dir: Option<String>,

    /// Spill codec: none, zstd, lz4
    #[arg(long)]
    spill_codec: Option<String>,

    /// Rows per batch handed from `table` downstream
    #[arg(long)]
    batch_size: Option<usize>,

    /// Rows per sorted run before `sort` spills
    #[arg(long)]
    sort_run_rows: Option<usize>,

    /// Event-time field name
    #[arg(long)]
    date_column: Option<String>,
}

impl EngineArgs {
    fn apply(&self, cfg: &mut EngineConfig) {
        if let Some(cap) = self.mem_cap {
            cfg.mem_cap_bytes = cap;
        }
        if let Some(bytes) = self.spill_threshold {
            cfg.buffer_spill_threshold_bytes = bytes;
        }
        if let Some(dir) = &self.spill_dir {
            cfg.spill_dir = dir.clone();
        }
        if let Some(codec) = &self.spill_codec {
            cfg.spill_codec = codec.clone();
        }
        if let Some(rows) = self.batch_size {
            cfg.batch_size = rows;
        }
        if let Some(rows) = self.sort_run_rows {
            cfg.sort_run_rows = rows;
        }
        if let Some(col) = &self.date_column {
            cfg.date_column = col.clone();
        }
    }

    /// Defaults, then environment, then flags.
    fn config(&self) -> Result<EngineConfig, Box<dyn std::error::Error>> {
        let mut cfg = EngineConfig::from_env();
        self.apply(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let outcome = match cli.command {
        Commands::Run {
            data_dir,
            query,
            output,
            report,
            engine,
        } => run_query(&data_dir, &query, output.as_deref(), report, &engine),
        Commands::Validate { query } => validate_query(&query),
        Commands::Explain {
            query,
            data_dir,
            engine,
        } => explain_query(&query, data_dir.as_deref(), &engine),
    };
    if let Err(e) = outcome {
        tracing::error!(error = %e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn service(data_dir: &Path, cfg: EngineConfig) -> Result<QueryService, Box<dyn std::error::Error>> {
    let catalog = TableCatalog::discover(data_dir)?;
    let lookups = LookupTables::load_dir(data_dir.join(LOOKUP_DIR))?;
    Ok(QueryService::new(
        cfg,
        Arc::new(FileLogStorage::new(data_dir)),
        Arc::new(catalog),
        Arc::new(lookups),
    ))
}

fn run_query(
    data_dir: &Path,
    query: &str,
    output: Option<&Path>,
    report: bool,
    engine: &EngineArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let svc = service(data_dir, engine.config()?)?;
    let consumer: Box<dyn RowConsumer> = match output {
        Some(path) => Box::new(JsonlRows::new(JsonlWriter::to_path(path)?)),
        None => Box::new(JsonlRows::new(JsonlWriter::to_writer(io::stdout()))),
    };
    let prepared = svc.prepare(query, consumer).map_err(syntax_pointer)?;
    tracing::info!(
        query = %prepared.id(),
        data_dir = %data_dir.display(),
        commands = prepared.commands().len(),
        "query prepared"
    );
    let done = svc.spawn(prepared)?.join()?;
    tracing::info!(
        query = %done.id,
        elapsed_ms = done.elapsed.as_millis() as u64,
        "query done"
    );
    if report {
        eprintln!("{}", serde_json::to_string_pretty(&done)?);
    }
    Ok(())
}

fn validate_query(query: &str) -> Result<(), Box<dyn std::error::Error>> {
    match logq_parser::compile(query) {
        Ok(head) => {
            println!("✓ Query is valid ({} stages)", chain(head.as_ref()).len());
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", e.pointer());
            Err(Box::new(e))
        }
    }
}

fn explain_query(
    query: &str,
    data_dir: Option<&Path>,
    engine: &EngineArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let lines = match data_dir {
        Some(dir) => {
            let svc = service(dir, engine.config()?)?;
            svc.prepare(query, Box::new(CollectRows::new()))
                .map_err(syntax_pointer)?
                .explain()
        }
        None => {
            let head = logq_parser::compile(query).map_err(|e| {
                eprintln!("{}", e.pointer());
                e
            })?;
            chain(head.as_ref())
                .iter()
                .map(|c| {
                    if c.is_reducer() {
                        format!("{}  [reducer]", c.describe())
                    } else {
                        c.describe()
                    }
                })
                .collect()
        }
    };

    println!("Command chain");
    println!("=============");
    for (i, line) in lines.iter().enumerate() {
        println!("  {}. {line}", i + 1);
    }
    Ok(())
}

/// Print the caret line for syntax errors before handing the error on.
fn syntax_pointer(err: logq_exec::ExecError) -> logq_exec::ExecError {
    if let logq_exec::ExecError::Syntax(e) = &err {
        eprintln!("{}", e.pointer());
    }
    err
}

//! punta CLI: raw import, stage runs and table status.
//!
//! Commands:
//! - `import-raw` replaces the raw table from a CSV dump
//! - `run` executes one stage or the whole pipeline
//! - `status` reports every configured table and its row count

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use punta_core::PipelineConfig;
use punta_runner::{Pipeline, Stage};
use punta_store::PriceStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "punta", about = "Point-in-time price pipeline: raw → bronze → silver → gold")]
struct Cli {
    /// Path to a JSON config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overriding `store.path` from the config.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the raw table with the contents of a CSV file.
    ImportRaw {
        /// CSV with columns date, open, high, low, close, adjusted_close, volume, ticker.
        #[arg(long)]
        csv: PathBuf,
    },
    /// Run one stage or the whole pipeline.
    Run {
        /// Stage to run: clean, stabilize, gold or all.
        #[arg(long, default_value = "all")]
        stage: Stage,
    },
    /// Report every configured table and its row count.
    Status,
}

fn load_config(path: Option<&Path>, db: Option<PathBuf>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(db) = db {
        config.store.path = db;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.db)?;
    let mut store = PriceStore::open(&config.store.path)
        .with_context(|| format!("opening store {}", config.store.path.display()))?;

    match cli.command {
        Commands::ImportRaw { csv } => {
            let rows = store.import_raw_csv(&config.tables.raw, &csv)?;
            println!("imported {rows} rows into {}", config.tables.raw);
        }
        Commands::Run { stage } => {
            let pipeline = Pipeline::new(config)?;
            info!(
                %stage,
                db = %pipeline.config().store.path.display(),
                benchmark = %pipeline.config().labels.benchmark_ticker,
                "starting run"
            );
            let report = pipeline.run_stage(&mut store, stage)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Status => {
            for table in config.tables.all() {
                if store.table_exists(table)? {
                    println!("{table:<20} {:>12} rows", store.row_count(table)?);
                } else {
                    println!("{table:<20} {:>12}", "missing");
                }
            }
        }
    }

    Ok(())
}

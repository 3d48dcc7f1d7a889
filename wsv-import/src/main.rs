//! wsv-import - Works Single View importer
//!
//! Command-line entry point for the chunked import-and-reconcile
//! pipeline and the sample-data generator. Exit code 0 on success,
//! non-zero on any parse, validation, IO, or store error.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wsv_common::config::{resolve_database_path, ImportConfig};
use wsv_import::CsvImporter;

/// Command-line arguments for wsv-import
#[derive(Parser, Debug)]
#[command(name = "wsv-import")]
#[command(about = "Works Single View CSV importer")]
#[command(version)]
struct Cli {
    /// Path to the SQLite database (falls back to WSV_DATABASE, then the
    /// platform data directory)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Path to the TOML configuration file
    #[arg(long, env = "WSV_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import works from a CSV file and reconcile them into the canonical store
    Import {
        /// Path to the input data file in CSV format
        file: PathBuf,
    },
    /// Generate a random sample CSV file
    GenerateSample {
        /// Number of rows to generate
        count: u64,

        /// Output file path
        #[arg(short, long, default_value = "sample.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wsv_import=info,wsv_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Import { file } => {
            let config = ImportConfig::load(cli.config.as_deref())
                .context("Failed to load configuration")?;
            let db_path = resolve_database_path(cli.database.as_deref());
            info!("Database: {}", db_path.display());

            let pool = wsv_common::db::init_database(&db_path)
                .await
                .context("Failed to initialize database")?;

            let importer = CsvImporter::new(pool, config);
            let summary = importer
                .import_from_file(&file)
                .await
                .context("Import failed")?;

            info!(
                records = summary.records,
                chunks = summary.chunks,
                "Done"
            );
        }
        Command::GenerateSample { count, output } => {
            wsv_import::sample::generate_sample_csv(&output, count)
                .context("Sample generation failed")?;
        }
    }

    Ok(())
}

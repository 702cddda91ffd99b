//! Ducklift - tabular file ingestion into DuckDB

use anyhow::Result;
use clap::Parser;
use ducklift_common::logging::{init_logging, LogConfig, LogLevel};
use ducklift_ingest::config::{self, ErrorPolicy, Settings};
use ducklift_ingest::pipeline::run_ingest;
use ducklift_ingest::remote::drive::DriveClient;
use ducklift_ingest::sink::DuckDbSink;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ducklift")]
#[command(author, version, about = "Ingest remote tabular files into DuckDB")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run the configured ingestion jobs
    Ingest {
        /// Settings document describing the jobs
        #[arg(short, long, default_value = "settings.yml")]
        settings: PathBuf,

        /// Database environment resolved through the dbt profiles file
        #[arg(long, default_value = "dev")]
        db_env: String,

        /// dbt profiles file used to resolve the database path
        #[arg(long, default_value = "profiles.yml")]
        profiles: PathBuf,

        /// Explicit database file, bypassing the profiles lookup
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Log and skip failing entries instead of aborting the run
        #[arg(long)]
        best_effort: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Environment variables take precedence over the CLI flag.
    let mut log_config = LogConfig::from_env()?;
    if cli.verbose && std::env::var("LOG_LEVEL").is_err() {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    match cli.command {
        Command::Ingest {
            settings,
            db_env,
            profiles,
            db_path,
            best_effort,
        } => {
            let mut settings = Settings::from_file(&settings)?;
            if best_effort {
                settings.run.on_error = ErrorPolicy::BestEffort;
            }

            let db_file = match db_path {
                Some(path) => path,
                None => PathBuf::from(config::database_path(&db_env, &profiles)?),
            };

            info!(db_file = %db_file.display(), "Starting ingestion run");

            let store = DriveClient::from_env()?;
            let sink = DuckDbSink::open(&db_file)?;

            let report = run_ingest(&store, &sink, &settings).await?;
            info!("Ingestion complete");
            println!("{}", report.summary());

            if !report.is_success() {
                anyhow::bail!("ingestion completed with failures");
            }
        },
    }

    Ok(())
}

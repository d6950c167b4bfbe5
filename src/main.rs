use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use coinhist::commands::{export, ingest};
use coinhist::config::IngestConfig;
use coinhist::context::AppContext;
use log::info;
use std::env;
use std::path::PathBuf;
use std::time::Instant;

const DEFAULT_EXPORT_FILE: &str = "data/snapshots.json";

#[derive(Parser)]
#[command(name = "coinhist")]
#[command(about = "Incremental daily-history ingestor for CoinGecko market data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and persist every daily snapshot the store is missing
    Ingest,
    /// Export the persisted snapshot table as a JSON array for the dashboard
    Export {
        /// Destination file for the export
        #[arg(short, long = "output", value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let Cli { command } = cli;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let database_url = env::var("DATABASE_URL").ok();
    if database_url.is_none() {
        return Err(anyhow!(
            "DATABASE_URL must be set; it is the address of the snapshot store."
        ));
    }
    let app_context = AppContext::initialize(database_url).await?;

    let started = Instant::now();
    match command {
        Commands::Ingest => {
            let config = IngestConfig::from_env()?;
            let today = Utc::now().date_naive();
            ingest::run(&app_context, &config, today).await?;
        }
        Commands::Export { output } => {
            let output_path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILE));
            export::run(&app_context, &output_path).await?;
        }
    }
    info!("Finished in {:.2}s", started.elapsed().as_secs_f64());

    Ok(())
}

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod poll;
mod refresh;
mod seed;
mod status;

#[derive(Debug, Parser)]
#[command(name = "newswire-cli")]
#[command(about = "Financial headline polling service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a polling session over the queued symbols.
    Poll {
        /// Wall-clock ceiling for this session, in hours.
        #[arg(long)]
        max_hours: Option<u64>,
        /// Budget threshold override for queue traversal (90-100).
        #[arg(long)]
        threshold: Option<u32>,
    },
    /// Seed the polling queue from the watchlist file.
    Seed {
        /// Watchlist YAML to seed from, overriding the configured path.
        #[arg(long)]
        watchlist: Option<PathBuf>,
    },
    /// Show queue contents and recent activity.
    Status,
    /// Replace the fingerprint cache with the provider's current listing.
    RefreshFingerprints,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = newswire_core::load_app_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Poll {
            max_hours,
            threshold,
        } => poll::run_poll(&config, max_hours, threshold).await,
        Commands::Seed { watchlist } => seed::run_seed(&config, watchlist.as_deref()),
        Commands::Status => status::run_status(&config).await,
        Commands::RefreshFingerprints => refresh::run_refresh(&config).await,
    }
}

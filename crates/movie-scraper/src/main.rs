//! Movie scraper CLI application.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use movie_scraper::{cancel_pair, HttpClient, MetadataAggregator};
use shared::{Config, LogConfig, MovieQuery, ProviderKind};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List candidate titles from every enabled provider
    Search {
        /// Title to search for
        name: String,
    },

    /// Resolve a title to a single metadata record
    Resolve {
        /// Title to search for when no identifier resolves
        name: String,

        /// Stored GEVI identifier (detail URL or site path)
        #[arg(long)]
        gevi: Option<String>,

        /// Stored AEBN identifier (detail URL or site path)
        #[arg(long)]
        aebn: Option<String>,
    },

    /// Download a binary resource such as a cover image
    Fetch {
        /// Resource URL
        url: String,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    shared::logging::init(LogConfig::from_settings(
        &config.logging,
        "movie-scraper",
        args.verbose,
    ))?;

    info!("Movie scraper starting");
    info!(config_file = %args.config.display(), "Loaded configuration");

    // Initialize HTTP client and providers
    let client = HttpClient::new(&config.scraper.language, config.http.timeout())
        .context("Failed to create HTTP client")?;
    let aggregator = MetadataAggregator::from_config(&config.scraper, Arc::new(client))
        .context("Failed to configure providers")?;

    // Ctrl-C cancels whatever is in flight
    let (handle, cancel) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            handle.cancel();
        }
    });

    match args.command {
        Command::Search { name } => {
            let candidates = aggregator
                .list_candidates(&name, &cancel)
                .await
                .context("Search failed")?;
            info!(query = %name, candidates = candidates.len(), "Search finished");
            println!("{}", serde_json::to_string_pretty(&candidates)?);
        }
        Command::Resolve { name, gevi, aebn } => {
            let mut query = MovieQuery::by_name(name);
            for (provider, identifier) in [(ProviderKind::Gevi, gevi), (ProviderKind::Aebn, aebn)] {
                if let Some(identifier) = identifier {
                    query = query.with_identifier(provider, identifier);
                }
            }

            let record = aggregator
                .resolve(&query, &cancel)
                .await
                .context("Resolve failed")?;
            if record.is_empty() {
                warn!(query = %query.name, "No metadata found");
            }
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Fetch { url, output } => {
            let bytes = aggregator
                .fetch_binary(&url, &cancel)
                .await
                .with_context(|| format!("Failed to fetch {}", url))?;
            std::fs::write(&output, &bytes)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!(url = %url, output = %output.display(), bytes = bytes.len(), "Resource saved");
        }
    }

    info!("Movie scraper finished successfully");

    Ok(())
}

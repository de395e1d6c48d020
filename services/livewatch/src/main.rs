//! Livewatch CLI
//!
//! Watches streaming services and posts go-live notifications, or sends a
//! single random pick and exits.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use livewatch::io::{HttpClient, ReqwestHttpClient};
use livewatch::webhook::WebhookNotifier;
use livewatch::{load_config, pick, Config, LivewatchError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::Level;

#[derive(Parser)]
#[command(name = "livewatch")]
#[command(about = "Live-stream and upload notification relay")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Poll every configured source until interrupted (default)
    Watch,
    /// Post one random Pokédex entry and exit
    Pokedex,
    /// Post one random trading card and exit
    Card,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let command = args.command.unwrap_or(Command::Watch);
    tracing::debug!(
        "Parsed command line arguments: config={:?}, log_level={:?}, command={:?}",
        args.config,
        args.log_level,
        command
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.resolve_secrets()?;

    match command {
        Command::Watch => {
            tracing::info!("Starting livewatch with {} source(s)", config.sources.len());
            livewatch::run(config).await?;
        }
        Command::Pokedex => {
            let pokedex = config.pokedex.ok_or_else(|| {
                LivewatchError::Config("no pokedex section in configuration".to_string())
            })?;
            let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::default());
            let notifier = WebhookNotifier::new(&pokedex.webhook_url, http);
            let mut rng = StdRng::from_entropy();
            pick::run_pokedex(&pokedex, &notifier, &mut rng).await?;
        }
        Command::Card => {
            let card_search = config.card_search.ok_or_else(|| {
                LivewatchError::Config("no card_search section in configuration".to_string())
            })?;
            let http: Arc<dyn HttpClient> =
                Arc::new(ReqwestHttpClient::with_timeout(card_search.request_timeout)?);
            let notifier = WebhookNotifier::new(&card_search.webhook_url, Arc::clone(&http));
            let mut rng = StdRng::from_entropy();
            pick::run_card(&card_search, http.as_ref(), &notifier, &mut rng).await?;
        }
    }

    Ok(())
}

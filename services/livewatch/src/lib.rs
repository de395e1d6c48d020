//! Livewatch - live-stream and upload notification relay
//!
//! Polls Twitch, TwitCasting, and YouTube for watched targets, detects
//! go-live and new-upload transitions, and posts them to a chat webhook.

pub mod config;
pub mod detector;
pub mod error;
pub mod io;
pub mod notifier;
pub mod pick;
pub mod scheduler;
pub mod source;
pub mod state;
pub mod twitcasting;
pub mod twitch;
pub mod webhook;
pub mod youtube;

pub use config::{load_config, Config};
pub use error::{LivewatchError, Result};

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::{ProviderConfig, SourceConfig};
use crate::detector::Detector;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::notifier::Notifier;
use crate::scheduler::Scheduler;
use crate::source::Source;
use crate::twitcasting::TwitCastingSource;
use crate::twitch::TwitchSource;
use crate::webhook::WebhookNotifier;
use crate::youtube::YouTubeSource;

/// Build the source adapter for a configured provider
pub fn build_source(
    provider: &ProviderConfig,
    http: Arc<dyn HttpClient>,
) -> Result<Arc<dyn Source>> {
    let source: Arc<dyn Source> = match provider {
        ProviderConfig::Twitch { .. } => Arc::new(TwitchSource::new(provider, http)?),
        ProviderConfig::YouTube { .. } => Arc::new(YouTubeSource::new(provider, http)?),
        ProviderConfig::TwitCasting { .. } => Arc::new(TwitCastingSource::new(provider, http)?),
    };
    Ok(source)
}

async fn build_scheduler(
    source_config: &SourceConfig,
    history_size: usize,
    cancel: CancellationToken,
) -> Result<Scheduler> {
    let http: Arc<dyn HttpClient> =
        Arc::new(ReqwestHttpClient::with_timeout(source_config.request_timeout)?);
    let source = build_source(&source_config.provider, Arc::clone(&http))?;
    let notifier: Arc<dyn Notifier> =
        Arc::new(WebhookNotifier::new(&source_config.webhook_url, http));

    source.prepare(&source_config.targets).await.map_err(|e| {
        LivewatchError::Startup(format!("{} source failed to start: {}", source.kind(), e))
    })?;

    let detector = Detector::new(source.kind().detection_mode())
        .announce_initial_live(source_config.announce_initial_live);

    Ok(Scheduler::new(
        source,
        notifier,
        source_config.targets.clone(),
        detector,
        source_config.timing(),
        history_size,
        cancel,
    ))
}

/// Run one polling loop per configured source until ctrl-c.
///
/// Startup failures and credential refresh failures stop every loop and are
/// returned.
pub async fn run(config: Config) -> Result<()> {
    if config.sources.is_empty() {
        return Err(LivewatchError::Config(
            "no sources configured to watch".to_string(),
        ));
    }

    let cancel = CancellationToken::new();

    let mut schedulers = Vec::with_capacity(config.sources.len());
    for source_config in &config.sources {
        schedulers.push(build_scheduler(source_config, config.history_size, cancel.clone()).await?);
    }

    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    let mut tasks = JoinSet::new();
    for mut scheduler in schedulers {
        tasks.spawn(async move { scheduler.run().await });
    }
    tracing::info!("Livewatch started with {} source(s)", tasks.len());

    let mut outcome = Ok(());
    while let Some(joined) = tasks.join_next().await {
        let result = joined
            .map_err(|e| LivewatchError::Startup(format!("polling task panicked: {}", e)))
            .and_then(|r| r);
        if let Err(e) = result {
            tracing::error!("Stopping all sources: {}", e);
            cancel.cancel();
            if outcome.is_ok() {
                outcome = Err(e);
            }
        }
    }

    tracing::info!("Livewatch stopped");
    outcome
}

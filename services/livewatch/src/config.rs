//! Configuration types for the livewatch service

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::source::{SourceKind, Target};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default)]
    pub pokedex: Option<PokedexConfig>,
    #[serde(default)]
    pub card_search: Option<CardSearchConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            history_size: default_history_size(),
            pokedex: None,
            card_search: None,
        }
    }
}

/// One polled service, its webhook, and the targets it watches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    pub webhook_url: String,
    pub targets: Vec<Target>,
    /// Overrides the provider's default timing
    #[serde(default)]
    pub timing: Option<TimingConfig>,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Announce targets that are already live on the first fetch
    #[serde(default)]
    pub announce_initial_live: bool,
}

impl SourceConfig {
    pub fn kind(&self) -> SourceKind {
        self.provider.kind()
    }

    pub fn timing(&self) -> TimingConfig {
        self.timing
            .clone()
            .unwrap_or_else(|| TimingConfig::for_kind(self.kind()))
    }
}

/// Credentials per service, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProviderConfig {
    #[serde(rename = "twitch")]
    Twitch {
        client_id: String,
        client_secret: String,
    },
    #[serde(rename = "youtube")]
    YouTube { api_key: String },
    #[serde(rename = "twitcasting")]
    TwitCasting {
        client_id: String,
        client_secret: String,
    },
}

impl ProviderConfig {
    pub fn kind(&self) -> SourceKind {
        match self {
            ProviderConfig::Twitch { .. } => SourceKind::Twitch,
            ProviderConfig::YouTube { .. } => SourceKind::YouTube,
            ProviderConfig::TwitCasting { .. } => SourceKind::TwitCasting,
        }
    }

    fn secrets_mut(&mut self) -> Vec<&mut String> {
        match self {
            ProviderConfig::Twitch {
                client_id,
                client_secret,
            }
            | ProviderConfig::TwitCasting {
                client_id,
                client_secret,
            } => vec![client_id, client_secret],
            ProviderConfig::YouTube { api_key } => vec![api_key],
        }
    }
}

/// Delays that pace one source's polling loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause after each successfully processed target
    #[serde(with = "humantime_serde")]
    pub inter_target_delay: Duration,
    /// Pause after a full pass over all targets
    #[serde(with = "humantime_serde")]
    pub cycle_delay: Duration,
    /// Pause after a target whose fetch failed
    #[serde(with = "humantime_serde")]
    pub error_backoff: Duration,
}

impl TimingConfig {
    pub fn for_kind(kind: SourceKind) -> Self {
        let (inter_target, cycle) = match kind {
            SourceKind::Twitch => (1, 60),
            SourceKind::TwitCasting => (2, 60),
            SourceKind::YouTube => (1, 70),
        };
        Self {
            inter_target_delay: Duration::from_secs(inter_target),
            cycle_delay: Duration::from_secs(cycle),
            error_backoff: Duration::from_secs(60),
        }
    }

    /// No delays at all; used to drive cycles back to back in tests
    pub fn immediate() -> Self {
        Self {
            inter_target_delay: Duration::ZERO,
            cycle_delay: Duration::ZERO,
            error_backoff: Duration::ZERO,
        }
    }
}

/// One-shot random Pokédex entry pick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PokedexConfig {
    pub webhook_url: String,
    #[serde(default = "default_max_pokemon_id")]
    pub max_id: u32,
}

/// One-shot random card pick from the card search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSearchConfig {
    pub webhook_url: String,
    /// Highest results page to pick from (inclusive)
    pub end_page: u32,
    #[serde(default = "default_cards_per_page")]
    pub cards_per_page: u32,
    #[serde(default = "default_retry_delay", with = "humantime_serde")]
    pub retry_delay: Duration,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,
}

fn default_history_size() -> usize {
    100
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_pokemon_id() -> u32 {
    1025
}

fn default_cards_per_page() -> u32 {
    39
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_attempts() -> u32 {
    20
}

impl Config {
    /// Replace `env:NAME` values with the named environment variable, then
    /// validate again against the resolved values
    pub fn resolve_secrets(&mut self) -> crate::Result<()> {
        for source in &mut self.sources {
            resolve_secret(&mut source.webhook_url)?;
            for secret in source.provider.secrets_mut() {
                resolve_secret(secret)?;
            }
        }
        if let Some(pokedex) = &mut self.pokedex {
            resolve_secret(&mut pokedex.webhook_url)?;
        }
        if let Some(card_search) = &mut self.card_search {
            resolve_secret(&mut card_search.webhook_url)?;
        }
        self.validate()
    }

    /// Reject configurations the scheduler cannot run
    pub fn validate(&self) -> crate::Result<()> {
        for source in &self.sources {
            let kind = source.kind();
            if source.webhook_url.trim().is_empty() {
                return Err(crate::LivewatchError::Config(format!(
                    "{} source has an empty webhook_url",
                    kind
                )));
            }
            if source.targets.is_empty() {
                return Err(crate::LivewatchError::Config(format!(
                    "{} source has no targets",
                    kind
                )));
            }
            let mut seen = HashSet::new();
            for target in &source.targets {
                if !seen.insert(target.id.as_str()) {
                    return Err(crate::LivewatchError::Config(format!(
                        "{} source lists target '{}' more than once",
                        kind, target.id
                    )));
                }
            }
        }
        if let Some(pokedex) = &self.pokedex {
            if pokedex.webhook_url.trim().is_empty() {
                return Err(crate::LivewatchError::Config(
                    "pokedex has an empty webhook_url".to_string(),
                ));
            }
            if pokedex.max_id == 0 {
                return Err(crate::LivewatchError::Config(
                    "pokedex.max_id must be at least 1".to_string(),
                ));
            }
        }
        if let Some(card_search) = &self.card_search {
            if card_search.webhook_url.trim().is_empty() {
                return Err(crate::LivewatchError::Config(
                    "card_search has an empty webhook_url".to_string(),
                ));
            }
            if card_search.cards_per_page == 0 || card_search.max_attempts == 0 {
                return Err(crate::LivewatchError::Config(
                    "card_search.cards_per_page and max_attempts must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn resolve_secret(value: &mut String) -> crate::Result<()> {
    if let Some(name) = value.strip_prefix("env:") {
        let resolved = std::env::var(name).map_err(|_| {
            crate::LivewatchError::Config(format!("environment variable {} is not set", name))
        })?;
        *value = resolved;
    }
    Ok(())
}

/// Load and validate configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::LivewatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "sources": [
                {
                    "type": "twitch",
                    "client_id": "cid",
                    "client_secret": "secret",
                    "webhook_url": "https://discord.com/api/webhooks/1/a",
                    "targets": [{"id": "alice_tv", "name": "Alice"}],
                    "announce_initial_live": true
                },
                {
                    "type": "youtube",
                    "api_key": "key",
                    "webhook_url": "https://discord.com/api/webhooks/2/b",
                    "targets": [{"id": "UCabc", "name": "Channel X"}],
                    "timing": {
                        "inter_target_delay": "500ms",
                        "cycle_delay": "2m",
                        "error_backoff": "90s"
                    },
                    "request_timeout": "10s"
                },
                {
                    "type": "twitcasting",
                    "client_id": "cid",
                    "client_secret": "secret",
                    "webhook_url": "https://discord.com/api/webhooks/3/c",
                    "targets": [{"id": "bob", "name": "Bob"}]
                }
            ],
            "history_size": 5
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[0].kind(), SourceKind::Twitch);
        assert!(config.sources[0].announce_initial_live);
        assert_eq!(
            config.sources[0].timing(),
            TimingConfig::for_kind(SourceKind::Twitch)
        );
        assert_eq!(config.sources[0].request_timeout, Duration::from_secs(30));

        let youtube = &config.sources[1];
        assert_eq!(youtube.kind(), SourceKind::YouTube);
        assert_eq!(youtube.timing().inter_target_delay, Duration::from_millis(500));
        assert_eq!(youtube.timing().cycle_delay, Duration::from_secs(120));
        assert_eq!(youtube.timing().error_backoff, Duration::from_secs(90));
        assert_eq!(youtube.request_timeout, Duration::from_secs(10));

        assert_eq!(config.sources[2].kind(), SourceKind::TwitCasting);
        assert_eq!(config.sources[2].timing().inter_target_delay, Duration::from_secs(2));
        assert_eq!(config.history_size, 5);
    }

    #[test]
    fn parse_minimal_config() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.sources.is_empty());
        assert_eq!(config.history_size, 100);
        assert!(config.pokedex.is_none());
        assert!(config.card_search.is_none());
    }

    #[test]
    fn default_timing_follows_provider() {
        let yt = TimingConfig::for_kind(SourceKind::YouTube);
        assert_eq!(yt.inter_target_delay, Duration::from_secs(1));
        assert_eq!(yt.cycle_delay, Duration::from_secs(70));
        assert_eq!(yt.error_backoff, Duration::from_secs(60));
    }

    #[test]
    fn parse_pick_sections_with_defaults() {
        let json = r#"{
            "pokedex": {"webhook_url": "https://hook/p"},
            "card_search": {"webhook_url": "https://hook/c", "end_page": 40}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let pokedex = config.pokedex.unwrap();
        assert_eq!(pokedex.max_id, 1025);
        let card = config.card_search.unwrap();
        assert_eq!(card.end_page, 40);
        assert_eq!(card.cards_per_page, 39);
        assert_eq!(card.retry_delay, Duration::from_secs(1));
        assert_eq!(card.max_attempts, 20);
    }

    #[test]
    fn unknown_provider_type_is_rejected() {
        let json = r#"{"sources": [{"type": "mixer", "webhook_url": "x", "targets": []}]}"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    fn twitch_source(targets: Vec<Target>, webhook_url: &str) -> SourceConfig {
        SourceConfig {
            provider: ProviderConfig::Twitch {
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
            webhook_url: webhook_url.to_string(),
            targets,
            timing: None,
            request_timeout: default_request_timeout(),
            announce_initial_live: false,
        }
    }

    #[test]
    fn validate_rejects_empty_targets() {
        let config = Config {
            sources: vec![twitch_source(vec![], "https://hook")],
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("no targets"));
    }

    #[test]
    fn validate_rejects_duplicate_targets() {
        let config = Config {
            sources: vec![twitch_source(
                vec![Target::new("a", "A"), Target::new("a", "A again")],
                "https://hook",
            )],
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn validate_rejects_empty_webhook() {
        let config = Config {
            sources: vec![twitch_source(vec![Target::new("a", "A")], "  ")],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolve_secrets_reads_environment() {
        std::env::set_var("LIVEWATCH_TEST_SECRET", "from-env");
        let mut config = Config {
            sources: vec![twitch_source(
                vec![Target::new("a", "A")],
                "env:LIVEWATCH_TEST_SECRET",
            )],
            ..Config::default()
        };
        config.resolve_secrets().unwrap();
        assert_eq!(config.sources[0].webhook_url, "from-env");
        match &config.sources[0].provider {
            ProviderConfig::Twitch { client_id, .. } => assert_eq!(client_id, "id"),
            other => panic!("unexpected provider {other:?}"),
        }
    }

    #[test]
    fn resolve_secrets_rejects_webhook_resolving_to_empty() {
        std::env::set_var("LIVEWATCH_TEST_EMPTY_WEBHOOK", "");
        let mut config = Config {
            sources: vec![twitch_source(
                vec![Target::new("a", "A")],
                "env:LIVEWATCH_TEST_EMPTY_WEBHOOK",
            )],
            ..Config::default()
        };
        assert!(config.validate().is_ok());

        let err = config.resolve_secrets().unwrap_err();
        assert!(err.to_string().contains("empty webhook_url"), "{err}");
    }

    #[test]
    fn validate_rejects_empty_pick_webhook() {
        let config = Config {
            pokedex: Some(PokedexConfig {
                webhook_url: " ".to_string(),
                max_id: 10,
            }),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn resolve_secrets_fails_on_missing_variable() {
        let mut config = Config {
            sources: vec![twitch_source(
                vec![Target::new("a", "A")],
                "env:LIVEWATCH_TEST_DEFINITELY_UNSET",
            )],
            ..Config::default()
        };
        let err = config.resolve_secrets().unwrap_err();
        assert!(err.to_string().contains("LIVEWATCH_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.json"));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"sources": [{
                "type": "twitcasting",
                "client_id": "a",
                "client_secret": "b",
                "webhook_url": "https://hook",
                "targets": [{"id": "bob", "name": "Bob"}]
            }]}"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.sources.len(), 1);
    }

    #[test]
    fn load_config_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "not json").unwrap();

        assert!(load_config(&config_path).is_err());
    }
}

//! TwitCasting user live-status source

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::io::HttpClient;
use crate::source::{Snapshot, Source, SourceKind, Target};

const API_URL: &str = "https://apiv2.twitcasting.tv";

#[derive(Debug, Deserialize)]
struct UserResponse {
    user: Option<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    is_live: bool,
    #[serde(default)]
    last_movie_id: Option<String>,
}

/// Watches TwitCasting users for a broadcast going live
pub struct TwitCastingSource {
    authorization: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for TwitCastingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitCastingSource").finish_non_exhaustive()
    }
}

impl TwitCastingSource {
    pub fn new(config: &ProviderConfig, http: Arc<dyn HttpClient>) -> crate::Result<Self> {
        let ProviderConfig::TwitCasting {
            client_id,
            client_secret,
        } = config
        else {
            return Err(crate::LivewatchError::Config(format!(
                "expected a twitcasting provider, got {}",
                config.kind()
            )));
        };

        let credentials = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", client_id, client_secret));

        Ok(Self {
            authorization: format!("Basic {}", credentials),
            http,
        })
    }
}

#[async_trait]
impl Source for TwitCastingSource {
    fn kind(&self) -> SourceKind {
        SourceKind::TwitCasting
    }

    async fn fetch(&self, target: &Target) -> crate::Result<Snapshot> {
        let url = format!("{}/users/{}", API_URL, target.id);
        let response = self
            .http
            .get(
                &url,
                &[
                    ("Accept", "application/json"),
                    ("Authorization", self.authorization.as_str()),
                    ("X-Api-Version", "2.0"),
                ],
            )
            .await?;

        if !response.is_ok() {
            return Err(crate::LivewatchError::Fetch(format!(
                "TwitCasting user {} returned status {}",
                target.id, response.status
            )));
        }

        let parsed: UserResponse = serde_json::from_str(&response.body)?;
        let user = parsed.user.ok_or_else(|| {
            crate::LivewatchError::Fetch(format!("TwitCasting response for {} has no user", target.id))
        })?;

        Ok(Snapshot {
            is_live: user.is_live,
            item_id: user.last_movie_id,
            ..Snapshot::default()
        })
    }
}

//! Twitch Helix stream source

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::ProviderConfig;
use crate::io::HttpClient;
use crate::source::{Snapshot, Source, SourceKind, Target};

const OAUTH_URL: &str = "https://id.twitch.tv/oauth2/token";
const HELIX_URL: &str = "https://api.twitch.tv/helix";

const STREAM_THUMBNAIL_SIZE: (u32, u32) = (825, 464);
const BOX_ART_SIZE: (u32, u32) = (288, 384);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    profile_image_url: String,
}

#[derive(Debug, Deserialize)]
struct StreamData {
    title: String,
    #[serde(default)]
    game_id: Option<String>,
    thumbnail_url: String,
}

#[derive(Debug, Deserialize)]
struct GameData {
    name: String,
    box_art_url: String,
}

/// App access token and the instant it stops being valid
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Instant,
}

impl AccessToken {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Watches Twitch channels for a stream going live
pub struct TwitchSource {
    client_id: String,
    client_secret: String,
    http: Arc<dyn HttpClient>,
    token: RwLock<Option<AccessToken>>,
    profile_images: RwLock<HashMap<String, String>>,
}

impl std::fmt::Debug for TwitchSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitchSource")
            .field("client_id", &self.client_id)
            .finish()
    }
}

impl TwitchSource {
    pub fn new(config: &ProviderConfig, http: Arc<dyn HttpClient>) -> crate::Result<Self> {
        let ProviderConfig::Twitch {
            client_id,
            client_secret,
        } = config
        else {
            return Err(crate::LivewatchError::Config(format!(
                "expected a twitch provider, got {}",
                config.kind()
            )));
        };

        Ok(Self {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            http,
            token: RwLock::new(None),
            profile_images: RwLock::new(HashMap::new()),
        })
    }

    /// Install a token directly, bypassing the OAuth exchange
    #[cfg(test)]
    async fn set_token(&self, token: AccessToken) {
        *self.token.write().await = Some(token);
    }

    async fn request_token(&self) -> crate::Result<AccessToken> {
        tracing::debug!("Requesting Twitch app access token");
        let response = self
            .http
            .post_form(
                OAUTH_URL,
                &[
                    ("client_id", self.client_id.as_str()),
                    ("client_secret", self.client_secret.as_str()),
                    ("grant_type", "client_credentials"),
                ],
            )
            .await
            .map_err(|e| crate::LivewatchError::Auth(e.to_string()))?;

        if !response.is_ok() {
            return Err(crate::LivewatchError::Auth(format!(
                "token endpoint returned status {}",
                response.status
            )));
        }

        let parsed: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| crate::LivewatchError::Auth(format!("malformed token response: {}", e)))?;

        Ok(AccessToken {
            value: parsed.access_token,
            expires_at: Instant::now() + Duration::from_secs(parsed.expires_in),
        })
    }

    /// Current bearer token, refreshed first if missing or expired
    async fn bearer(&self) -> crate::Result<String> {
        if let Some(token) = self.token.read().await.as_ref() {
            if !token.is_expired(Instant::now()) {
                return Ok(token.value.clone());
            }
            tracing::info!("Twitch access token expired, refreshing");
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *self.token.write().await = Some(token);
        Ok(value)
    }

    async fn helix_get(&self, path_and_query: &str) -> crate::Result<String> {
        let bearer = format!("Bearer {}", self.bearer().await?);
        let url = format!("{}/{}", HELIX_URL, path_and_query);
        let response = self
            .http
            .get(
                &url,
                &[
                    ("Client-ID", self.client_id.as_str()),
                    ("Authorization", bearer.as_str()),
                ],
            )
            .await?;

        if !response.is_ok() {
            return Err(crate::LivewatchError::Fetch(format!(
                "Twitch {} returned status {}",
                path_and_query, response.status
            )));
        }
        Ok(response.body)
    }

    async fn game_info(&self, game_id: &str) -> Option<GameData> {
        let body = match self.helix_get(&format!("games?id={}", game_id)).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Game lookup for {} failed: {}", game_id, e);
                return None;
            }
        };
        serde_json::from_str::<DataResponse<GameData>>(&body)
            .ok()
            .and_then(|r| r.data.into_iter().next())
    }
}

/// Fill the `{width}x{height}` template and defeat caching with a timestamp
fn sized_image_url(template: &str, (width, height): (u32, u32), cache_key: u64) -> String {
    let url = template
        .replace("{width}", &width.to_string())
        .replace("{height}", &height.to_string());
    format!("{}?v={}", url, cache_key)
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[async_trait]
impl Source for TwitchSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Twitch
    }

    async fn prepare(&self, targets: &[Target]) -> crate::Result<()> {
        self.ensure_auth()
            .await
            .map_err(|e| crate::LivewatchError::Startup(e.to_string()))?;

        for target in targets {
            let body = self
                .helix_get(&format!("users?login={}", target.id))
                .await
                .map_err(|e| {
                    crate::LivewatchError::Startup(format!(
                        "user lookup for {} failed: {}",
                        target.name, e
                    ))
                })?;
            let image = serde_json::from_str::<DataResponse<UserData>>(&body)
                .ok()
                .and_then(|r| r.data.into_iter().next())
                .map(|u| u.profile_image_url)
                .filter(|url| !url.is_empty())
                .ok_or_else(|| {
                    crate::LivewatchError::Startup(format!(
                        "no profile image for {}",
                        target.name
                    ))
                })?;

            tracing::debug!("Profile image for {}: {}", target.name, image);
            self.profile_images
                .write()
                .await
                .insert(target.id.clone(), image);
        }
        Ok(())
    }

    async fn ensure_auth(&self) -> crate::Result<()> {
        self.bearer().await.map(|_| ())
    }

    async fn fetch(&self, target: &Target) -> crate::Result<Snapshot> {
        let body = self
            .helix_get(&format!("streams?user_login={}", target.id))
            .await?;
        let streams: DataResponse<StreamData> = serde_json::from_str(&body)?;

        let Some(stream) = streams.data.into_iter().next() else {
            return Ok(Snapshot::live(false));
        };

        let cache_key = unix_seconds();
        let game = match stream.game_id.as_deref().filter(|id| !id.is_empty()) {
            Some(game_id) => self.game_info(game_id).await,
            None => None,
        };

        Ok(Snapshot {
            is_live: true,
            item_id: None,
            title: Some(stream.title),
            image_url: Some(sized_image_url(
                &stream.thumbnail_url,
                STREAM_THUMBNAIL_SIZE,
                cache_key,
            )),
            thumbnail_url: game
                .as_ref()
                .map(|g| sized_image_url(&g.box_art_url, BOX_ART_SIZE, cache_key)),
            author_icon_url: self.profile_images.read().await.get(&target.id).cloned(),
            footer: game.map(|g| format!("Game: {}", g.name)),
        })
    }
}

//! YouTube Data API latest-upload source

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::ProviderConfig;
use crate::io::HttpClient;
use crate::source::{Snapshot, Source, SourceKind, Target};

const API_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ItemsResponse<T> {
    #[serde(default)]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    snippet: PlaylistSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet {
    title: String,
    resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct Video {
    snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    live_broadcast_content: String,
}

/// Uploads playlist of a channel: the channel id with its second character
/// replaced by `U` (`UCxxxx` becomes `UUxxxx`)
pub fn uploads_playlist_id(channel_id: &str) -> Option<String> {
    let mut chars = channel_id.chars();
    let first = chars.next()?;
    chars.next()?;
    Some(format!("{}U{}", first, chars.as_str()))
}

/// Watches YouTube channels for a new upload or live broadcast
pub struct YouTubeSource {
    api_key: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for YouTubeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeSource").finish_non_exhaustive()
    }
}

impl YouTubeSource {
    pub fn new(config: &ProviderConfig, http: Arc<dyn HttpClient>) -> crate::Result<Self> {
        let ProviderConfig::YouTube { api_key } = config else {
            return Err(crate::LivewatchError::Config(format!(
                "expected a youtube provider, got {}",
                config.kind()
            )));
        };

        Ok(Self {
            api_key: api_key.clone(),
            http,
        })
    }

    async fn api_get(&self, resource: &str, query: &str) -> crate::Result<String> {
        let url = format!("{}/{}?{}", API_URL, resource, query);
        let response = self
            .http
            .get(
                &url,
                &[
                    ("Accept", "application/json"),
                    ("X-Goog-Api-Key", self.api_key.as_str()),
                ],
            )
            .await?;
        if !response.is_ok() {
            return Err(crate::LivewatchError::Fetch(format!(
                "YouTube {} returned status {}",
                resource, response.status
            )));
        }
        Ok(response.body)
    }

    /// Whether a video is currently broadcasting live
    async fn is_live_broadcast(&self, video_id: &str) -> crate::Result<bool> {
        let body = self
            .api_get(
                "videos",
                &format!("id={}&part=snippet,liveStreamingDetails", video_id),
            )
            .await?;
        let videos: ItemsResponse<Video> = serde_json::from_str(&body)?;
        let video = videos.items.into_iter().next().ok_or_else(|| {
            crate::LivewatchError::Fetch(format!("video {} not found", video_id))
        })?;
        Ok(video.snippet.live_broadcast_content == "live")
    }
}

#[async_trait]
impl Source for YouTubeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::YouTube
    }

    async fn fetch(&self, target: &Target) -> crate::Result<Snapshot> {
        let playlist_id = uploads_playlist_id(&target.id).ok_or_else(|| {
            crate::LivewatchError::Fetch(format!("'{}' is not a channel id", target.id))
        })?;

        let body = self
            .api_get(
                "playlistItems",
                &format!("playlistId={}&part=snippet&maxResults=1", playlist_id),
            )
            .await?;
        let playlist: ItemsResponse<PlaylistItem> = serde_json::from_str(&body)?;

        let Some(latest) = playlist.items.into_iter().next() else {
            tracing::debug!("No uploads yet for {}", target.name);
            return Ok(Snapshot::default());
        };

        Ok(Snapshot::item(latest.snippet.resource_id.video_id).with_title(latest.snippet.title))
    }

    async fn enrich(&self, target: &Target, mut snapshot: Snapshot) -> Snapshot {
        let Some(video_id) = snapshot.item_id().map(str::to_string) else {
            return snapshot;
        };
        match self.is_live_broadcast(&video_id).await {
            Ok(is_live) => snapshot.is_live = is_live,
            Err(e) => {
                tracing::warn!(
                    "Could not check live status of {} for {}: {}",
                    video_id,
                    target.name,
                    e
                );
                snapshot.is_live = false;
            }
        }
        snapshot
    }
}

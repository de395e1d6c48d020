//! Source trait, targets, and snapshot types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A configured entity to watch on one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Identifier the source API understands (login, channel id, user id)
    pub id: String,
    /// Display name used in notifications
    pub name: String,
}

impl Target {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The service a source polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Twitch,
    #[serde(rename = "youtube")]
    YouTube,
    #[serde(rename = "twitcasting")]
    TwitCasting,
}

impl SourceKind {
    /// How snapshots from this kind of source are compared
    pub fn detection_mode(&self) -> DetectionMode {
        match self {
            SourceKind::Twitch | SourceKind::TwitCasting => DetectionMode::Liveness,
            SourceKind::YouTube => DetectionMode::LatestItem,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Twitch => write!(f, "twitch"),
            SourceKind::YouTube => write!(f, "youtube"),
            SourceKind::TwitCasting => write!(f, "twitcasting"),
        }
    }
}

/// Which snapshot field carries the notifiable signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    /// A not-live to live edge is a transition
    Liveness,
    /// A new, non-empty latest-item id is a transition
    LatestItem,
}

/// Result of one fetch for one target.
///
/// Only `is_live` and `item_id` take part in change detection. The remaining
/// fields are display metadata consumed when composing a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub is_live: bool,
    pub item_id: Option<String>,
    pub title: Option<String>,
    pub image_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub author_icon_url: Option<String>,
    pub footer: Option<String>,
}

impl Snapshot {
    /// A liveness observation with no display metadata
    pub fn live(is_live: bool) -> Self {
        Self {
            is_live,
            ..Self::default()
        }
    }

    /// A latest-item observation with no display metadata
    pub fn item(item_id: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.into()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The latest-item id, treating an empty string as absent
    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Trait for fetching the current observable state of a target.
///
/// Implementations hide authentication, pagination, and parsing. Every
/// failure mode must come back as an `Err`, which the scheduler treats as a
/// skipped target for the current cycle.
#[async_trait]
pub trait Source: Send + Sync + fmt::Debug {
    /// The kind of service this source polls
    fn kind(&self) -> SourceKind;

    /// Load per-target metadata needed before the first cycle.
    ///
    /// An error here is fatal: the process stops before polling starts.
    async fn prepare(&self, _targets: &[Target]) -> crate::Result<()> {
        Ok(())
    }

    /// Refresh credentials if they have expired.
    ///
    /// Called at the start of every cycle. An error means the refresh itself
    /// failed and the source cannot continue. A fetch that refreshes lazily
    /// must report a failed refresh as `LivewatchError::Auth`, which also
    /// stops the scheduler.
    async fn ensure_auth(&self) -> crate::Result<()> {
        Ok(())
    }

    /// Fetch the current snapshot for a target
    async fn fetch(&self, target: &Target) -> crate::Result<Snapshot>;

    /// Add details to a snapshot that is about to be announced.
    ///
    /// Only called for transitions, so sources can defer lookups that are
    /// not needed for change detection.
    async fn enrich(&self, _target: &Target, snapshot: Snapshot) -> Snapshot {
        snapshot
    }
}

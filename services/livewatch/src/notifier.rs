//! Notifier trait and webhook message payloads

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::source::{Snapshot, SourceKind, Target};

/// Webhook message body: plain content plus optional rich embeds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookMessage {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl WebhookMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            embeds: Vec::new(),
        }
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedMedia>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedMedia {
    pub url: String,
}

impl EmbedMedia {
    fn from_url(url: Option<&String>) -> Option<Self> {
        url.map(|url| Self { url: url.clone() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

/// A notifiable change for one target
#[derive(Debug, Clone)]
pub struct Transition<'a> {
    pub kind: SourceKind,
    pub target: &'a Target,
    pub snapshot: &'a Snapshot,
}

impl Transition<'_> {
    /// Link to the content that triggered the transition
    pub fn link(&self) -> String {
        match self.kind {
            SourceKind::Twitch => format!("https://www.twitch.tv/{}", self.target.id),
            SourceKind::TwitCasting => format!("https://twitcasting.tv/{}", self.target.id),
            SourceKind::YouTube => format!(
                "https://www.youtube.com/watch?v={}",
                self.snapshot.item_id().unwrap_or_default()
            ),
        }
    }

    /// Build the webhook payload announcing this transition
    pub fn to_message(&self) -> WebhookMessage {
        let name = &self.target.name;
        let link = self.link();

        match self.kind {
            SourceKind::Twitch => {
                let embed = Embed {
                    author: Some(EmbedAuthor {
                        name: name.clone(),
                        icon_url: self.snapshot.author_icon_url.clone(),
                        url: Some(link.clone()),
                    }),
                    title: self.snapshot.title.clone(),
                    url: Some(link.clone()),
                    image: EmbedMedia::from_url(self.snapshot.image_url.as_ref()),
                    thumbnail: EmbedMedia::from_url(self.snapshot.thumbnail_url.as_ref()),
                    footer: self
                        .snapshot
                        .footer
                        .as_ref()
                        .map(|text| EmbedFooter { text: text.clone() }),
                };
                WebhookMessage::text(format!("📢 {} started streaming!\nWatch: {}", name, link))
                    .with_embed(embed)
            }
            SourceKind::TwitCasting => {
                WebhookMessage::text(format!("📢 {} started streaming!\nWatch: {}", name, link))
            }
            SourceKind::YouTube => {
                let headline = if self.snapshot.is_live {
                    format!("📢 {} started a live stream!", name)
                } else {
                    format!("📢 {} uploaded a new video!", name)
                };
                let mut content = headline;
                if let Some(title) = &self.snapshot.title {
                    content.push_str(&format!("\n{}", title));
                }
                content.push_str(&format!("\nWatch: {}", link));
                WebhookMessage::text(content)
            }
        }
    }
}

/// Record of a delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub target_name: String,
    pub destination: String,
    pub message: String,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp_epoch_ms: u64,
}

/// Trait for delivering notifications
#[async_trait]
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Where messages go, for logging (e.g. a redacted webhook URL)
    fn destination(&self) -> &str;

    /// Deliver a message. Any outcome other than acceptance is an error.
    async fn notify(&self, message: &WebhookMessage) -> crate::Result<()>;
}

//! Chat webhook notification client

use std::sync::Arc;

use async_trait::async_trait;

use crate::io::HttpClient;
use crate::notifier::{Notifier, WebhookMessage};

/// Status the webhook endpoint answers with when it accepts a message
pub const ACCEPTED_STATUS: u16 = 204;

/// Posts JSON messages to a fixed webhook URL
pub struct WebhookNotifier {
    url: String,
    destination: String,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("destination", &self.destination)
            .finish()
    }
}

impl WebhookNotifier {
    pub fn new(url: &str, http: Arc<dyn HttpClient>) -> Self {
        let destination = redact(url);
        tracing::debug!("Created WebhookNotifier for {}", destination);

        Self {
            url: url.to_string(),
            destination,
            http,
        }
    }
}

/// Hide the token segment of a webhook URL so it can be logged
fn redact(url: &str) -> String {
    match url.rsplit_once('/') {
        Some((base, token)) if !token.is_empty() && base.contains("://") => {
            format!("{}/***", base)
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn destination(&self) -> &str {
        &self.destination
    }

    async fn notify(&self, message: &WebhookMessage) -> crate::Result<()> {
        let body = serde_json::to_value(message)?;

        tracing::debug!(
            "Posting webhook message to {} ({} embeds)",
            self.destination,
            message.embeds.len()
        );

        let response = self
            .http
            .post_json(&self.url, &body)
            .await
            .map_err(|e| {
                crate::LivewatchError::Notify(format!(
                    "webhook {} unreachable: {}",
                    self.destination, e
                ))
            })?;

        if response.status != ACCEPTED_STATUS {
            return Err(crate::LivewatchError::Notify(format!(
                "webhook {} returned status {}: {}",
                self.destination, response.status, response.body
            )));
        }

        tracing::debug!("Webhook message accepted by {}", self.destination);
        Ok(())
    }
}

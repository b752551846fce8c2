//! Synology Chat channel adapter.
//!
//! Inbound: Synology Chat outgoing webhooks POST a URL-encoded form with the
//! shared `token`, the sender's `user_id`/`username`, and the message `text`.
//! Outbound: messages are delivered through an incoming-webhook URL as a
//! single `payload` form field carrying JSON `{"text": ..., "user_ids": [..]}`.

use serde::Deserialize;
use std::time::Duration;

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

/// Channel error type.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Message send failed: {0}")]
    SendFailed(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Inbound outgoing-webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct SynologyEvent {
    /// Shared secret configured on the Synology side.
    pub token: String,
    /// Numeric sender id, delivered as a form string.
    pub user_id: String,
    /// Sender display name.
    pub username: String,
    /// Message text.
    #[serde(default)]
    pub text: String,
}

/// Synology Chat incoming-webhook client.
pub struct SynologyChannel {
    client: reqwest::Client,
    webhook_url: String,
}

impl SynologyChannel {
    /// Create a channel targeting the configured incoming-webhook URL.
    pub fn new(webhook_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }

    /// Deliver a text message to a user. One attempt, no retry.
    pub async fn send(&self, user_id: &str, text: &str) -> ChannelResult<()> {
        let uid: i64 = user_id.parse().map_err(|_| {
            ChannelError::InvalidMessage(format!("user_id is not numeric: {user_id}"))
        })?;

        let payload = serde_json::json!({
            "text": text,
            "user_ids": [uid],
        });

        let resp = self
            .client
            .post(&self.webhook_url)
            .form(&[("payload", payload.to_string())])
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed(format!(
                "webhook returned {status}: {body}"
            )));
        }

        tracing::debug!(user_id, chars = text.chars().count(), "Synology message sent");
        Ok(())
    }
}

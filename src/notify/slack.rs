// src/notify/slack.rs
// =============================================================================
// Posts a message to a Slack incoming webhook.
//
// See https://api.slack.com/messaging/webhooks for the payload format.
// Only `text` is required; the rest override the webhook's defaults.
// =============================================================================

use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

// JSON body sent to the webhook
#[derive(Debug, Clone, Default, Serialize)]
pub struct Webhook {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_emoji: Option<String>,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    /// The request never got a response
    #[error("failed to post to Slack: {0}")]
    Request(#[from] reqwest::Error),

    /// Slack answered, but not with 2xx
    #[error("HTTP status code is not OK ({status}): '{body}'")]
    Status { status: u16, body: String },
}

// Sends `payload` as JSON to the webhook URL
pub async fn post(client: &Client, hook: &str, payload: &Webhook) -> Result<(), NotifyError> {
    // .json() also sets Content-Type: application/json
    let response = client.post(hook).json(payload).send().await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await?;
        return Err(NotifyError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(())
}

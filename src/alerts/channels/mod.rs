//! Alert delivery channels

mod discord;
mod email;
mod slack;
mod webhook;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{AlertConfig, ChannelSpec};
use super::model::Alert;

pub use discord::{discord_payload, DiscordChannel};
pub use email::{
    render_email, EmailChannel, EmailMessage, EmailProvider, HttpEmailProvider,
};
pub use slack::{slack_payload, SlackChannel};
pub use webhook::{webhook_payload, WebhookChannel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Webhook,
    Email,
    Slack,
    Discord,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Webhook => "webhook",
            ChannelKind::Email => "email",
            ChannelKind::Slack => "slack",
            ChannelKind::Discord => "discord",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment facts sent alongside every alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub environment: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl SystemInfo {
    pub fn new(environment: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            version: version.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An independent way of delivering an alert
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn kind(&self) -> ChannelKind;

    fn is_enabled(&self) -> bool {
        true
    }

    async fn send(&self, alert: &Alert, system: &SystemInfo) -> Result<(), ChannelError>;
}

/// Delivery errors
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Email error: {0}")]
    Email(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Channel panicked: {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for ChannelError {
    fn from(e: reqwest::Error) -> Self {
        ChannelError::Transport(e.to_string())
    }
}

/// POST a JSON body; anything but 2xx is a failure
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    payload: &serde_json::Value,
) -> Result<(), ChannelError> {
    let response = client.post(url).json(payload).send().await?;

    if !response.status().is_success() {
        let (status, body) = crate::http::failure(response).await;
        return Err(ChannelError::Status { status, body });
    }

    Ok(())
}

/// Field table shared by the chat channels
pub(crate) fn alert_fields(alert: &Alert, system: &SystemInfo) -> Vec<(&'static str, String)> {
    vec![
        ("Type", alert.alert_type.to_string()),
        ("Severity", alert.severity.as_str().to_uppercase()),
        ("Service", alert.service.clone().unwrap_or_else(|| "n/a".to_string())),
        ("Environment", system.environment.clone()),
        ("Message", alert.message.clone()),
        (
            "Timestamp",
            alert.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
    ]
}

/// Email channel from its spec entries (`recipients`, `from`); the provider
/// exists only when an API key is configured.
fn email_channel(spec: &ChannelSpec, config: &AlertConfig) -> EmailChannel {
    let recipients: Vec<String> = spec
        .config
        .get("recipients")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let from = spec
        .config
        .get("from")
        .cloned()
        .unwrap_or_else(|| config.email_from.clone());

    let provider = config.email_api_key.as_ref().map(|key| {
        Arc::new(HttpEmailProvider::new(
            config.email_api_url.clone(),
            key.clone(),
            from,
            config.channel_timeout,
        )) as Arc<dyn EmailProvider>
    });

    EmailChannel::new(provider, recipients)
}

/// Build the channels described by `config`.
///
/// Channels without an endpoint are skipped; chat channels with an endpoint
/// but no enable flag are built disabled.
pub fn build_channels(config: &AlertConfig) -> Vec<Arc<dyn AlertChannel>> {
    let timeout = config.channel_timeout;
    let mut channels: Vec<Arc<dyn AlertChannel>> = Vec::new();

    for spec in config.channel_specs() {
        let url = spec.config.get("url").cloned();
        match (spec.kind, url) {
            (ChannelKind::Webhook, Some(url)) => {
                channels.push(Arc::new(WebhookChannel::new(url, timeout)));
            }
            (ChannelKind::Slack, Some(url)) => {
                channels.push(Arc::new(SlackChannel::new(url, spec.enabled, timeout)));
            }
            (ChannelKind::Discord, Some(url)) => {
                channels.push(Arc::new(DiscordChannel::new(url, spec.enabled, timeout)));
            }
            (ChannelKind::Email, _) => {
                channels.push(Arc::new(email_channel(&spec, config)));
            }
            (kind, None) => {
                tracing::debug!(channel = %kind, "Alert channel has no endpoint configured");
            }
        }
    }

    channels
}

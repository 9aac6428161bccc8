//! Discord webhook channel

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{alert_fields, post_json, AlertChannel, ChannelError, ChannelKind, SystemInfo};
use crate::alerts::model::Alert;

/// Embed with a severity-mapped color and the shared field table
pub fn discord_payload(alert: &Alert, system: &SystemInfo) -> serde_json::Value {
    let fields: Vec<serde_json::Value> = alert_fields(alert, system)
        .into_iter()
        .map(|(name, value)| {
            json!({
                "name": name,
                "value": value,
                "inline": name != "Message",
            })
        })
        .collect();

    json!({
        "username": "Health Monitor",
        "embeds": [{
            "title": format!("{} {}", alert.severity.emoji(), alert.title),
            "description": alert.message,
            "color": alert.severity.discord_color(),
            "fields": fields,
            "timestamp": alert.created_at.to_rfc3339(),
            "footer": { "text": format!("healthwatch {}", system.version) },
        }]
    })
}

#[derive(Debug, Clone)]
pub struct DiscordChannel {
    client: reqwest::Client,
    webhook_url: String,
    enabled: bool,
}

impl DiscordChannel {
    pub fn new(webhook_url: impl Into<String>, enabled: bool, timeout: Duration) -> Self {
        Self {
            client: crate::http::client(timeout),
            webhook_url: webhook_url.into(),
            enabled,
        }
    }
}

#[async_trait]
impl AlertChannel for DiscordChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Discord
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, alert: &Alert, system: &SystemInfo) -> Result<(), ChannelError> {
        post_json(&self.client, &self.webhook_url, &discord_payload(alert, system)).await
    }
}

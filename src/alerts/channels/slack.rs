//! Slack incoming-webhook channel

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{alert_fields, post_json, AlertChannel, ChannelError, ChannelKind, SystemInfo};
use crate::alerts::model::Alert;

/// Message with one severity-colored attachment carrying the field table
pub fn slack_payload(alert: &Alert, system: &SystemInfo) -> serde_json::Value {
    let fields: Vec<serde_json::Value> = alert_fields(alert, system)
        .into_iter()
        .map(|(title, value)| {
            json!({
                "title": title,
                "value": value,
                "short": title != "Message",
            })
        })
        .collect();

    json!({
        "username": "Health Monitor",
        "text": format!("{} *{}*", alert.severity.emoji(), alert.title),
        "attachments": [{
            "color": alert.severity.slack_color(),
            "title": alert.title,
            "text": alert.message,
            "fields": fields,
            "footer": format!("healthwatch {}", system.version),
            "ts": alert.created_at.timestamp(),
        }]
    })
}

#[derive(Debug, Clone)]
pub struct SlackChannel {
    client: reqwest::Client,
    webhook_url: String,
    enabled: bool,
}

impl SlackChannel {
    pub fn new(webhook_url: impl Into<String>, enabled: bool, timeout: Duration) -> Self {
        Self {
            client: crate::http::client(timeout),
            webhook_url: webhook_url.into(),
            enabled,
        }
    }
}

#[async_trait]
impl AlertChannel for SlackChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Slack
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, alert: &Alert, system: &SystemInfo) -> Result<(), ChannelError> {
        post_json(&self.client, &self.webhook_url, &slack_payload(alert, system)).await
    }
}

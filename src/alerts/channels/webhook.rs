//! Generic JSON webhook

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{post_json, AlertChannel, ChannelError, ChannelKind, SystemInfo};
use crate::alerts::model::Alert;

/// `{ "alert": ..., "system_info": ... }`
pub fn webhook_payload(alert: &Alert, system: &SystemInfo) -> serde_json::Value {
    json!({
        "alert": alert,
        "system_info": system,
    })
}

/// POSTs the alert as JSON to an arbitrary consumer
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: crate::http::client(timeout),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AlertChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    async fn send(&self, alert: &Alert, system: &SystemInfo) -> Result<(), ChannelError> {
        post_json(&self.client, &self.url, &webhook_payload(alert, system)).await?;

        tracing::debug!(alert_id = %alert.id, url = %self.url, "Webhook notification sent");
        Ok(())
    }
}

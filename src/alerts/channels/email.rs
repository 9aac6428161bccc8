//! Email channel backed by a transactional email API

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use super::{alert_fields, AlertChannel, ChannelError, ChannelKind, SystemInfo};
use crate::alerts::model::Alert;

/// A rendered email ready for the provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Transactional email provider
#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), ChannelError>;
}

/// Provider speaking the common `POST {base}/emails` JSON API
#[derive(Debug, Clone)]
pub struct HttpEmailProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailProvider {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: crate::http::client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl EmailProvider for HttpEmailProvider {
    async fn send(&self, message: &EmailMessage) -> Result<(), ChannelError> {
        let payload = json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "html": message.html,
            "text": message.text,
        });
        let url = format!("{}/emails", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let (status, body) = crate::http::failure(response).await;
            return Err(ChannelError::Email(format!("provider returned {}: {}", status, body)));
        }
        Ok(())
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render subject, HTML and plain-text bodies from the alert fields and metadata
pub fn render_email(alert: &Alert, system: &SystemInfo, to: Vec<String>) -> EmailMessage {
    let subject = format!(
        "[{}] {} ({})",
        alert.severity.as_str().to_uppercase(),
        alert.title,
        system.environment
    );

    let fields = alert_fields(alert, system);

    let mut metadata: Vec<(&String, &serde_json::Value)> = alert.metadata.iter().collect();
    metadata.sort_by(|a, b| a.0.cmp(b.0));

    let mut text = format!("{}\n\n", alert.title);
    for (name, value) in &fields {
        text.push_str(&format!("{}: {}\n", name, value));
    }
    if !metadata.is_empty() {
        text.push_str("\nMetadata:\n");
        for (key, value) in &metadata {
            text.push_str(&format!("  {}: {}\n", key, value));
        }
    }
    text.push_str(&format!("\nAlert ID: {}\n", alert.id));

    let rows: String = fields
        .iter()
        .map(|(name, value)| {
            format!(
                "<tr><th align=\"left\">{}</th><td>{}</td></tr>",
                name,
                escape_html(value)
            )
        })
        .collect();
    let metadata_rows: String = metadata
        .iter()
        .map(|(key, value)| {
            format!(
                "<tr><th align=\"left\">{}</th><td><code>{}</code></td></tr>",
                escape_html(key),
                escape_html(&value.to_string())
            )
        })
        .collect();

    let html = format!(
        "<html><body>\
         <h2 style=\"color:{color}\">{emoji} {title}</h2>\
         <p>{message}</p>\
         <table cellpadding=\"4\">{rows}</table>\
         {metadata}\
         <p style=\"color:#888\">Alert ID: {id}</p>\
         </body></html>",
        color = alert.severity.slack_color(),
        emoji = alert.severity.emoji(),
        title = escape_html(&alert.title),
        message = escape_html(&alert.message),
        rows = rows,
        metadata = if metadata_rows.is_empty() {
            String::new()
        } else {
            format!("<h3>Metadata</h3><table cellpadding=\"4\">{}</table>", metadata_rows)
        },
        id = escape_html(&alert.id),
    );

    EmailMessage {
        to,
        subject,
        html,
        text,
    }
}

/// Always-enabled email channel. Without a provider the rendered message is
/// logged and the attempt reported as failed.
pub struct EmailChannel {
    provider: Option<Arc<dyn EmailProvider>>,
    recipients: Vec<String>,
}

impl EmailChannel {
    pub fn new(provider: Option<Arc<dyn EmailProvider>>, recipients: Vec<String>) -> Self {
        Self {
            provider,
            recipients,
        }
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    fn log_fallback(alert: &Alert, message: &EmailMessage, reason: &str) {
        tracing::warn!(
            alert_id = %alert.id,
            recipients = ?message.to,
            subject = %message.subject,
            reason,
            "Email alert not delivered; logging content instead\n{}",
            message.text
        );
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, alert: &Alert, system: &SystemInfo) -> Result<(), ChannelError> {
        let message = render_email(alert, system, self.recipients.clone());

        let Some(provider) = &self.provider else {
            Self::log_fallback(alert, &message, "no email provider configured");
            return Err(ChannelError::Email("no email provider configured".to_string()));
        };

        match provider.send(&message).await {
            Ok(()) => Ok(()),
            Err(e) => {
                Self::log_fallback(alert, &message, &e.to_string());
                Err(e)
            }
        }
    }
}

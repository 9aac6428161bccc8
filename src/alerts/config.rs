//! Alerting configuration types

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::channels::ChannelKind;
use crate::config::{self, ConfigError, Lookup};

/// Recipient used when no email recipients are configured
pub const FALLBACK_ALERT_RECIPIENT: &str = "ops@localhost";

/// Default transactional email API
pub const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com";

/// Thresholds consulted by the trigger rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Probe latency above this fires a performance alert
    pub response_time_ms: u64,
    /// Carried for consumers; no rule evaluates it yet
    pub error_rate_percent: f64,
    /// Carried for consumers; rules evaluate each snapshot on its own
    pub consecutive_failures: u32,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            response_time_ms: 5000,
            error_rate_percent: 10.0,
            consecutive_failures: 3,
        }
    }
}

/// One delivery channel as described by configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSpec {
    pub kind: ChannelKind,
    /// Channel-specific settings (`url`, `recipients`, ...)
    pub config: HashMap<String, String>,
    pub enabled: bool,
}

/// Alerting configuration
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    pub email_recipients: Vec<String>,
    pub email_from: String,
    pub email_api_key: Option<String>,
    pub email_api_url: String,
    pub slack_webhook_url: Option<String>,
    pub slack_enabled: bool,
    pub discord_webhook_url: Option<String>,
    pub discord_enabled: bool,
    pub thresholds: AlertThresholds,
    /// Upper bound for one delivery attempt on one channel
    pub channel_timeout: Duration,
    pub environment: String,
    pub version: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            email_recipients: Vec::new(),
            email_from: "alerts@localhost".to_string(),
            email_api_key: None,
            email_api_url: DEFAULT_EMAIL_API_URL.to_string(),
            slack_webhook_url: None,
            slack_enabled: false,
            discord_webhook_url: None,
            discord_enabled: false,
            thresholds: AlertThresholds::default(),
            channel_timeout: Duration::from_secs(10),
            environment: "development".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl AlertConfig {
    /// Load from process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&config::env_lookup)
    }

    /// Load from an arbitrary key lookup
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            enabled: config::flag(lookup, "ALERTS_ENABLED", defaults.enabled)?,
            webhook_url: config::string(lookup, "ALERT_WEBHOOK_URL"),
            email_recipients: config::list(lookup, "ALERT_EMAIL_RECIPIENTS").unwrap_or_default(),
            email_from: config::string(lookup, "ALERT_EMAIL_FROM").unwrap_or(defaults.email_from),
            email_api_key: config::string(lookup, "EMAIL_API_KEY"),
            email_api_url: config::string(lookup, "EMAIL_API_URL").unwrap_or(defaults.email_api_url),
            slack_webhook_url: config::string(lookup, "SLACK_WEBHOOK_URL"),
            slack_enabled: config::flag(lookup, "SLACK_ALERTS_ENABLED", false)?,
            discord_webhook_url: config::string(lookup, "DISCORD_WEBHOOK_URL"),
            discord_enabled: config::flag(lookup, "DISCORD_ALERTS_ENABLED", false)?,
            thresholds: AlertThresholds {
                response_time_ms: config::parsed(
                    lookup,
                    "ALERT_RESPONSE_TIME_THRESHOLD_MS",
                    defaults.thresholds.response_time_ms,
                )?,
                error_rate_percent: config::parsed(
                    lookup,
                    "ALERT_ERROR_RATE_THRESHOLD",
                    defaults.thresholds.error_rate_percent,
                )?,
                consecutive_failures: config::parsed(
                    lookup,
                    "ALERT_CONSECUTIVE_FAILURES_THRESHOLD",
                    defaults.thresholds.consecutive_failures,
                )?,
            },
            channel_timeout: Duration::from_secs(config::parsed(
                lookup,
                "ALERT_CHANNEL_TIMEOUT_SECS",
                10u64,
            )?),
            environment: config::first_of(lookup, &["APP_ENV", "ENVIRONMENT"])
                .unwrap_or(defaults.environment),
            version: config::string(lookup, "APP_VERSION").unwrap_or(defaults.version),
        })
    }

    /// Recipients for email alerts, falling back to the operations address
    pub fn effective_recipients(&self) -> Vec<String> {
        if self.email_recipients.is_empty() {
            vec![FALLBACK_ALERT_RECIPIENT.to_string()]
        } else {
            self.email_recipients.clone()
        }
    }

    /// Channel descriptions with the enablement policy applied:
    /// webhook only with a URL, email always, chat channels only when both a
    /// URL and the explicit flag are set.
    pub fn channel_specs(&self) -> Vec<ChannelSpec> {
        let url_spec = |kind: ChannelKind, url: &Option<String>, enabled: bool| {
            let mut config = HashMap::new();
            if let Some(url) = url {
                config.insert("url".to_string(), url.clone());
            }
            ChannelSpec {
                kind,
                config,
                enabled: enabled && url.is_some(),
            }
        };

        let mut email = HashMap::new();
        email.insert("recipients".to_string(), self.effective_recipients().join(","));
        email.insert("from".to_string(), self.email_from.clone());

        vec![
            url_spec(ChannelKind::Webhook, &self.webhook_url, true),
            ChannelSpec {
                kind: ChannelKind::Email,
                config: email,
                enabled: true,
            },
            url_spec(ChannelKind::Slack, &self.slack_webhook_url, self.slack_enabled),
            url_spec(ChannelKind::Discord, &self.discord_webhook_url, self.discord_enabled),
        ]
    }
}

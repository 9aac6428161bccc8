//! Fan-out of one alert to every enabled channel

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::Serialize;

use super::channels::{AlertChannel, ChannelError, ChannelKind, SystemInfo};
use super::model::Alert;

/// Result of one delivery attempt on one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryOutcome {
    pub channel: ChannelKind,
    pub success: bool,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

/// Sends alerts to all enabled channels at once.
///
/// Attempts are joined as settled results: a failing, hanging or panicking
/// channel yields a failed outcome and never affects its siblings.
pub struct Notifier {
    channels: Vec<Arc<dyn AlertChannel>>,
    timeout: Duration,
    environment: String,
    version: String,
}

impl Notifier {
    pub fn new(
        channels: Vec<Arc<dyn AlertChannel>>,
        timeout: Duration,
        environment: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            channels,
            timeout,
            environment: environment.into(),
            version: version.into(),
        }
    }

    /// Channels that will receive alerts
    pub fn enabled_channels(&self) -> Vec<ChannelKind> {
        self.channels
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| c.kind())
            .collect()
    }

    /// Deliver `alert` to every enabled channel concurrently
    pub async fn deliver(&self, alert: &Alert) -> Vec<DeliveryOutcome> {
        let system = SystemInfo::new(self.environment.clone(), self.version.clone());

        let enabled: Vec<&Arc<dyn AlertChannel>> =
            self.channels.iter().filter(|c| c.is_enabled()).collect();

        if enabled.is_empty() {
            tracing::warn!(
                alert_id = %alert.id,
                severity = %alert.severity,
                title = %alert.title,
                "No alert channels enabled; alert not delivered"
            );
            return Vec::new();
        }

        let attempts = enabled
            .into_iter()
            .map(|channel| self.attempt(channel.as_ref(), alert, &system));

        futures::future::join_all(attempts).await
    }

    async fn attempt(
        &self,
        channel: &dyn AlertChannel,
        alert: &Alert,
        system: &SystemInfo,
    ) -> DeliveryOutcome {
        let kind = channel.kind();
        let start = Instant::now();

        let send = tokio::time::timeout(self.timeout, channel.send(alert, system));
        let result = match AssertUnwindSafe(send).catch_unwind().await {
            Ok(Ok(sent)) => sent,
            Ok(Err(_)) => Err(ChannelError::Timeout(self.timeout)),
            Err(panic) => Err(ChannelError::Panicked(
                panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string()),
            )),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => {
                tracing::info!(
                    alert_id = %alert.id,
                    channel = %kind,
                    success = true,
                    elapsed_ms,
                    "Alert delivered"
                );
                DeliveryOutcome {
                    channel: kind,
                    success: true,
                    error: None,
                    elapsed_ms,
                }
            }
            Err(e) => {
                tracing::error!(
                    alert_id = %alert.id,
                    channel = %kind,
                    success = false,
                    error = %e,
                    error_kind = ?e,
                    elapsed_ms,
                    "Alert delivery failed"
                );
                DeliveryOutcome {
                    channel: kind,
                    success: false,
                    error: Some(e.to_string()),
                    elapsed_ms,
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::alerts::model::{AlertSeverity, AlertType};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Clone, Copy, PartialEq)]
    pub(crate) enum Mode {
        Succeed,
        Fail,
        Panic,
        Hang,
    }

    /// Channel fake recording every alert id it was asked to deliver
    pub(crate) struct FakeChannel {
        pub kind: ChannelKind,
        pub mode: Mode,
        pub enabled: bool,
        pub delivered: Mutex<Vec<String>>,
    }

    impl FakeChannel {
        pub(crate) fn new(kind: ChannelKind, mode: Mode) -> Arc<Self> {
            Arc::new(Self {
                kind,
                mode,
                enabled: true,
                delivered: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn disabled(kind: ChannelKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                mode: Mode::Succeed,
                enabled: false,
                delivered: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn delivered(&self) -> Vec<String> {
            self.delivered.lock().clone()
        }
    }

    #[async_trait]
    impl AlertChannel for FakeChannel {
        fn kind(&self) -> ChannelKind {
            self.kind
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }

        async fn send(&self, alert: &Alert, _system: &SystemInfo) -> Result<(), ChannelError> {
            match self.mode {
                Mode::Succeed => {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    self.delivered.lock().push(alert.id.clone());
                    Ok(())
                }
                Mode::Fail => Err(ChannelError::Transport("connection reset".to_string())),
                Mode::Panic => panic!("channel exploded"),
                Mode::Hang => futures::future::pending().await,
            }
        }
    }

    fn alert() -> Alert {
        Alert::new(AlertType::SystemError, AlertSeverity::High, "Disk full", "/var at 99%")
    }

    fn notifier(channels: Vec<Arc<dyn AlertChannel>>) -> Notifier {
        Notifier::new(channels, Duration::from_millis(300), "test", "0.0.0")
    }

    #[tokio::test]
    async fn test_failing_channel_does_not_block_others() {
        let webhook = FakeChannel::new(ChannelKind::Webhook, Mode::Fail);
        let email = FakeChannel::new(ChannelKind::Email, Mode::Succeed);
        let slack = FakeChannel::new(ChannelKind::Slack, Mode::Panic);
        let discord = FakeChannel::new(ChannelKind::Discord, Mode::Succeed);
        let notifier = notifier(vec![
            webhook.clone(),
            email.clone(),
            slack.clone(),
            discord.clone(),
        ]);

        let alerts: Vec<Alert> = (0..3).map(|_| alert()).collect();
        for alert in &alerts {
            let outcomes = notifier.deliver(alert).await;
            assert_eq!(outcomes.len(), 4);

            let by_kind = |kind| outcomes.iter().find(|o| o.channel == kind).unwrap();
            assert!(!by_kind(ChannelKind::Webhook).success);
            assert!(by_kind(ChannelKind::Email).success);
            assert!(!by_kind(ChannelKind::Slack).success);
            assert!(by_kind(ChannelKind::Slack)
                .error
                .as_deref()
                .unwrap()
                .contains("channel exploded"));
            assert!(by_kind(ChannelKind::Discord).success);
        }

        let ids: Vec<String> = alerts.iter().map(|a| a.id.clone()).collect();
        assert_eq!(email.delivered(), ids);
        assert_eq!(discord.delivered(), ids);
    }

    #[tokio::test]
    async fn test_hanging_channel_times_out() {
        let hanging = FakeChannel::new(ChannelKind::Webhook, Mode::Hang);
        let email = FakeChannel::new(ChannelKind::Email, Mode::Succeed);
        let notifier = notifier(vec![hanging, email.clone()]);

        let start = Instant::now();
        let outcomes = notifier.deliver(&alert()).await;

        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(outcomes[0].error.as_deref(), Some("Timed out after 300ms"));
        assert!(outcomes[1].success);
        assert_eq!(email.delivered().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_channels_are_skipped() {
        let slack = FakeChannel::disabled(ChannelKind::Slack);
        let email = FakeChannel::new(ChannelKind::Email, Mode::Succeed);
        let notifier = notifier(vec![slack.clone(), email]);

        assert_eq!(notifier.enabled_channels(), vec![ChannelKind::Email]);
        let outcomes = notifier.deliver(&alert()).await;

        assert_eq!(outcomes.len(), 1);
        assert!(slack.delivered().is_empty());
    }

    #[tokio::test]
    async fn test_no_enabled_channels_drops_quietly() {
        let notifier = notifier(vec![FakeChannel::disabled(ChannelKind::Slack)]);
        assert!(notifier.deliver(&alert()).await.is_empty());
    }
}

//! Alert engine: turns health reports into stored, dispatched alerts

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::channels::{build_channels, AlertChannel};
use super::config::AlertConfig;
use super::model::{Alert, AlertSeverity, AlertStatus, AlertType};
use super::notifier::{DeliveryOutcome, Notifier};
use super::rules::{evaluate_all, TriggerRule};
use super::store::AlertStore;
use crate::health::HealthCheckResponse;

/// An alert and what happened on each channel
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub alert: Alert,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    pub fn delivered(&self) -> bool {
        self.outcomes.iter().any(|o| o.success)
    }
}

/// Lifecycle operation errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum AlertError {
    #[error("Alert not found: {0}")]
    NotFound(String),

    #[error("Alert {id} cannot move from {from}")]
    InvalidTransition { id: String, from: AlertStatus },
}

pub struct AlertEngine {
    config: AlertConfig,
    rules: Vec<TriggerRule>,
    store: Arc<AlertStore>,
    notifier: Notifier,
}

impl AlertEngine {
    pub fn new(
        config: AlertConfig,
        store: Arc<AlertStore>,
        channels: Vec<Arc<dyn AlertChannel>>,
    ) -> Self {
        let notifier = Notifier::new(
            channels,
            config.channel_timeout,
            config.environment.clone(),
            config.version.clone(),
        );

        Self {
            rules: TriggerRule::standard(&config.thresholds),
            config,
            store,
            notifier,
        }
    }

    /// Engine with the channels `config` describes and a fresh store
    pub fn from_config(config: AlertConfig) -> Self {
        let channels = build_channels(&config);
        Self::new(config, Arc::new(AlertStore::new()), channels)
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    /// Evaluate every result of `response`, store and dispatch the alerts.
    ///
    /// Alerts are dispatched concurrently. Returns nothing when alerting is
    /// disabled.
    pub async fn process(&self, response: &HealthCheckResponse) -> Vec<DispatchReport> {
        if !self.config.enabled {
            tracing::debug!("Alerting disabled; skipping evaluation");
            return Vec::new();
        }

        let alerts: Vec<Alert> = response
            .checks
            .iter()
            .flat_map(|result| evaluate_all(&self.rules, result))
            .map(|alert| alert.with_metadata("environment", self.config.environment.clone()))
            .collect();

        if alerts.is_empty() {
            return Vec::new();
        }

        tracing::info!(
            count = alerts.len(),
            status = %response.status,
            "Health check triggered alerts"
        );

        futures::future::join_all(alerts.into_iter().map(|alert| self.dispatch(alert))).await
    }

    /// Raise an alert not derived from a health check
    pub async fn raise(
        &self,
        alert_type: AlertType,
        severity: AlertSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
        service: Option<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Option<DispatchReport> {
        if !self.config.enabled {
            tracing::debug!("Alerting disabled; dropping raised alert");
            return None;
        }

        let mut alert = Alert::new(alert_type, severity, title, message)
            .with_metadata("environment", self.config.environment.clone());
        alert.service = service;
        alert.metadata.extend(metadata);

        Some(self.dispatch(alert).await)
    }

    async fn dispatch(&self, alert: Alert) -> DispatchReport {
        self.store.append(alert.clone());
        let outcomes = self.notifier.deliver(&alert).await;

        tracing::info!(
            alert_id = %alert.id,
            severity = %alert.severity,
            title = %alert.title,
            channels = outcomes.len(),
            delivered = outcomes.iter().filter(|o| o.success).count(),
            "Alert dispatched"
        );

        DispatchReport { alert, outcomes }
    }

    pub fn active_alerts(&self) -> Vec<Alert> {
        self.store.active()
    }

    pub fn history(&self) -> Vec<Alert> {
        self.store.history()
    }

    pub fn acknowledge(&self, id: &str) -> Result<Alert, AlertError> {
        self.transition(id, AlertStore::acknowledge)
    }

    pub fn resolve(&self, id: &str) -> Result<Alert, AlertError> {
        self.transition(id, AlertStore::resolve)
    }

    fn transition(
        &self,
        id: &str,
        apply: fn(&AlertStore, &str) -> bool,
    ) -> Result<Alert, AlertError> {
        let current = self
            .store
            .get(id)
            .ok_or_else(|| AlertError::NotFound(id.to_string()))?;

        if !apply(&self.store, id) {
            return Err(AlertError::InvalidTransition {
                id: id.to_string(),
                from: current.status(),
            });
        }

        let updated = self
            .store
            .get(id)
            .ok_or_else(|| AlertError::NotFound(id.to_string()))?;
        tracing::info!(alert_id = %id, status = %updated.status(), "Alert status changed");
        Ok(updated)
    }
}

//! Trigger rules evaluated against each health check result

use serde_json::json;

use super::config::AlertThresholds;
use super::model::{Alert, AlertSeverity, AlertType};
use crate::health::{HealthCheckResult, HealthStatus};

/// Condition that turns a probe result into an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerRule {
    /// Result is unhealthy
    Unhealthy,
    /// Result is degraded
    Degraded,
    /// Probe took longer than the threshold, whatever its status
    SlowResponse { threshold_ms: u64 },
}

impl TriggerRule {
    /// The rule set every engine runs
    pub fn standard(thresholds: &AlertThresholds) -> Vec<TriggerRule> {
        vec![
            TriggerRule::Unhealthy,
            TriggerRule::Degraded,
            TriggerRule::SlowResponse {
                threshold_ms: thresholds.response_time_ms,
            },
        ]
    }

    /// Build the alert this rule fires for `result`, if any
    pub fn evaluate(&self, result: &HealthCheckResult) -> Option<Alert> {
        let alert = match self {
            TriggerRule::Unhealthy if result.status == HealthStatus::Unhealthy => Alert::new(
                AlertType::HealthCheckFailure,
                AlertSeverity::Critical,
                format!("Service Unhealthy: {}", result.service),
                result.message.clone(),
            ),
            TriggerRule::Degraded if result.status == HealthStatus::Degraded => Alert::new(
                AlertType::PerformanceDegradation,
                AlertSeverity::Medium,
                format!("Service Degraded: {}", result.service),
                result.message.clone(),
            ),
            TriggerRule::SlowResponse { threshold_ms } if result.response_time > *threshold_ms => {
                Alert::new(
                    AlertType::PerformanceDegradation,
                    AlertSeverity::Low,
                    format!("Slow Response: {}", result.service),
                    format!(
                        "Response time {}ms exceeds threshold {}ms",
                        result.response_time, threshold_ms
                    ),
                )
                .with_metadata("threshold_ms", *threshold_ms)
            }
            _ => return None,
        };

        Some(
            alert
                .with_service(result.service.clone())
                .with_metadata("status", result.status.as_str())
                .with_metadata("response_time_ms", result.response_time)
                .with_metadata("check_message", result.message.clone())
                .with_metadata("checked_at", result.timestamp.to_rfc3339())
                .with_metadata("details", json!(result.details)),
        )
    }
}

/// Every alert the rules fire for one result; rules are independent
pub fn evaluate_all(rules: &[TriggerRule], result: &HealthCheckResult) -> Vec<Alert> {
    rules.iter().filter_map(|rule| rule.evaluate(result)).collect()
}

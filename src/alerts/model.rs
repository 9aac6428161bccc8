//! Alert records and their lifecycle

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// What kind of condition produced an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    HealthCheckFailure,
    PerformanceDegradation,
    SecurityIncident,
    SystemError,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::HealthCheckFailure => "health_check_failure",
            AlertType::PerformanceDegradation => "performance_degradation",
            AlertType::SecurityIncident => "security_incident",
            AlertType::SystemError => "system_error",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }

    /// Attachment color for Slack
    pub fn slack_color(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "#36a64f",
            AlertSeverity::Medium => "#ff9500",
            AlertSeverity::High => "#ff4500",
            AlertSeverity::Critical => "#ff0000",
        }
    }

    /// Embed color for Discord
    pub fn discord_color(&self) -> u32 {
        match self {
            AlertSeverity::Low => 0x36a64f,
            AlertSeverity::Medium => 0xff9500,
            AlertSeverity::High => 0xff4500,
            AlertSeverity::Critical => 0xff0000,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "ℹ️",
            AlertSeverity::Medium => "⚠️",
            AlertSeverity::High => "🔥",
            AlertSeverity::Critical => "🚨",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification derived from one triggering condition.
///
/// `status` and `resolved_at` change only through [`Alert::acknowledge`] and
/// [`Alert::resolve`]: active → acknowledged → resolved, or active → resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    resolved_at: Option<DateTime<Utc>>,
    status: AlertStatus,
}

impl Alert {
    /// Create an active alert with a fresh id
    pub fn new(
        alert_type: AlertType,
        severity: AlertSeverity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let created_at = Utc::now();
        Self {
            id: generate_id(created_at),
            alert_type,
            severity,
            title: title.into(),
            message: message.into(),
            service: None,
            metadata: HashMap::new(),
            created_at,
            resolved_at: None,
            status: AlertStatus::Active,
        }
    }

    /// Set the service the alert concerns
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    /// active → acknowledged. Returns false from any other state.
    pub fn acknowledge(&mut self) -> bool {
        match self.status {
            AlertStatus::Active => {
                self.status = AlertStatus::Acknowledged;
                true
            }
            AlertStatus::Acknowledged | AlertStatus::Resolved => false,
        }
    }

    /// active/acknowledged → resolved, stamping `resolved_at`.
    /// Returns false once resolved; the first timestamp is kept.
    pub fn resolve(&mut self, at: DateTime<Utc>) -> bool {
        match self.status {
            AlertStatus::Active | AlertStatus::Acknowledged => {
                self.status = AlertStatus::Resolved;
                self.resolved_at = Some(at);
                true
            }
            AlertStatus::Resolved => false,
        }
    }
}

/// `alert_<unix millis>_<9 random base36 chars>`
fn generate_id(at: DateTime<Utc>) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("alert_{}_{}", at.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn alert() -> Alert {
        Alert::new(
            AlertType::HealthCheckFailure,
            AlertSeverity::Critical,
            "Service Unhealthy: database",
            "connection refused",
        )
        .with_service("database")
    }

    #[test]
    fn test_new_alert_is_active() {
        let alert = alert();
        assert_eq!(alert.status(), AlertStatus::Active);
        assert!(alert.resolved_at().is_none());
        assert!(alert.id.starts_with("alert_"));
    }

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..500).map(|_| alert().id).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_acknowledge_only_from_active() {
        let mut alert = alert();
        assert!(alert.acknowledge());
        assert_eq!(alert.status(), AlertStatus::Acknowledged);
        assert!(!alert.acknowledge());

        let mut resolved = self::alert();
        assert!(resolved.resolve(Utc::now()));
        assert!(!resolved.acknowledge());
        assert_eq!(resolved.status(), AlertStatus::Resolved);
    }

    #[test]
    fn test_resolve_sets_timestamp_once() {
        let mut alert = alert();
        alert.acknowledge();

        let first = Utc::now();
        assert!(alert.resolve(first));
        assert_eq!(alert.resolved_at(), Some(first));

        let later = first + chrono::Duration::seconds(30);
        assert!(!alert.resolve(later));
        assert_eq!(alert.resolved_at(), Some(first));
    }

    #[test]
    fn test_serialized_shape() {
        let alert = alert().with_metadata("response_time_ms", 12);
        let json = serde_json::to_value(&alert).unwrap();

        assert_eq!(json["type"], "health_check_failure");
        assert_eq!(json["severity"], "critical");
        assert_eq!(json["status"], "active");
        assert_eq!(json["service"], "database");
        assert!(json["resolved_at"].is_null());
    }

    #[test]
    fn test_metadata_survives_json_round_trip() {
        let alert = alert()
            .with_metadata("response_time_ms", 6000)
            .with_metadata("details", serde_json::json!({ "nested": { "rows": [1, 2, 3] } }))
            .with_metadata("environment", "production")
            .with_metadata("ratio", 0.75)
            .with_metadata("flag", true);

        let json = serde_json::to_string(&alert).unwrap();
        let back: Alert = serde_json::from_str(&json).unwrap();

        assert_eq!(back.metadata, alert.metadata);
        assert_eq!(back, alert);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AlertSeverity::Critical > AlertSeverity::High);
        assert!(AlertSeverity::Medium > AlertSeverity::Low);
    }
}

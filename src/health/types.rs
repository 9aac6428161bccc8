//! Health check result types

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health of a single dependency, or of the whole system.
///
/// Variants are ordered by severity so the overall status of a set of
/// results is simply the maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }

    /// Reduce a set of statuses: unhealthy beats degraded beats healthy.
    /// An empty set is healthy.
    pub fn overall<I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = HealthStatus>,
    {
        statuses
            .into_iter()
            .max()
            .unwrap_or(HealthStatus::Healthy)
    }

    /// Partial-failure mapping shared by the multi-part probes:
    /// all passing is healthy, none passing is unhealthy, anything else degraded.
    pub fn from_partial(passed: usize, total: usize) -> HealthStatus {
        if passed == total {
            HealthStatus::Healthy
        } else if passed == 0 {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Degraded
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResult {
    /// Name of the probed dependency
    pub service: String,
    pub status: HealthStatus,
    /// Wall-clock time the probe took, in milliseconds
    pub response_time: u64,
    pub message: String,
    #[serde(default)]
    pub details: HashMap<String, serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl HealthCheckResult {
    pub fn new(service: impl Into<String>, status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            status,
            response_time: 0,
            message: message.into(),
            details: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn healthy(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, HealthStatus::Healthy, message)
    }

    pub fn degraded(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, HealthStatus::Degraded, message)
    }

    pub fn unhealthy(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(service, HealthStatus::Unhealthy, message)
    }

    /// Set the measured response time
    pub fn with_response_time(mut self, millis: u64) -> Self {
        self.response_time = millis;
        self
    }

    /// Attach a detail entry
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Per-status counts over a response's results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub degraded: usize,
}

impl HealthSummary {
    pub fn from_results(results: &[HealthCheckResult]) -> Self {
        let mut summary = HealthSummary::default();
        for result in results {
            match result.status {
                HealthStatus::Healthy => summary.healthy += 1,
                HealthStatus::Degraded => summary.degraded += 1,
                HealthStatus::Unhealthy => summary.unhealthy += 1,
            }
        }
        summary.total = summary.healthy + summary.unhealthy + summary.degraded;
        summary
    }
}

/// Aggregated report returned by every health check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    /// Process uptime in seconds
    pub uptime: f64,
    pub version: String,
    pub environment: String,
    pub checks: Vec<HealthCheckResult>,
    pub summary: HealthSummary,
}

impl HealthCheckResponse {
    /// Build a response from probe results, deriving summary and overall status.
    pub fn from_results(
        checks: Vec<HealthCheckResult>,
        uptime: f64,
        version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        let status = HealthStatus::overall(checks.iter().map(|c| c.status));
        let summary = HealthSummary::from_results(&checks);
        Self {
            status,
            timestamp: Utc::now(),
            uptime,
            version: version.into(),
            environment: environment.into(),
            checks,
            summary,
        }
    }

    pub fn is_unhealthy(&self) -> bool {
        self.status == HealthStatus::Unhealthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(service: &str, status: HealthStatus) -> HealthCheckResult {
        HealthCheckResult::new(service, status, "")
    }

    #[test]
    fn test_overall_precedence() {
        use HealthStatus::*;

        assert_eq!(HealthStatus::overall(vec![]), Healthy);
        assert_eq!(HealthStatus::overall(vec![Healthy, Healthy]), Healthy);
        assert_eq!(HealthStatus::overall(vec![Healthy, Degraded]), Degraded);
        assert_eq!(HealthStatus::overall(vec![Degraded, Unhealthy, Healthy]), Unhealthy);
        // one unhealthy outweighs any number of healthy results
        let mut many = vec![Healthy; 50];
        many.push(Unhealthy);
        assert_eq!(HealthStatus::overall(many), Unhealthy);
    }

    #[test]
    fn test_overall_matches_definition_for_all_small_sets() {
        use HealthStatus::*;
        let all = [Healthy, Degraded, Unhealthy];

        for a in all {
            for b in all {
                for c in all {
                    let set = [a, b, c];
                    let expected = if set.contains(&Unhealthy) {
                        Unhealthy
                    } else if set.contains(&Degraded) {
                        Degraded
                    } else {
                        Healthy
                    };
                    assert_eq!(HealthStatus::overall(set), expected);
                }
            }
        }
    }

    #[test]
    fn test_from_partial() {
        assert_eq!(HealthStatus::from_partial(3, 3), HealthStatus::Healthy);
        assert_eq!(HealthStatus::from_partial(0, 3), HealthStatus::Unhealthy);
        assert_eq!(HealthStatus::from_partial(1, 3), HealthStatus::Degraded);
    }

    #[test]
    fn test_database_down_scenario() {
        let response = HealthCheckResponse::from_results(
            vec![
                result("database", HealthStatus::Unhealthy),
                result("cache", HealthStatus::Healthy),
            ],
            1.0,
            "1.0.0",
            "test",
        );

        assert_eq!(response.status, HealthStatus::Unhealthy);
        assert_eq!(
            response.summary,
            HealthSummary {
                total: 2,
                healthy: 1,
                unhealthy: 1,
                degraded: 0,
            }
        );
    }

    #[test]
    fn test_summary_total_is_sum() {
        let results = vec![
            result("a", HealthStatus::Healthy),
            result("b", HealthStatus::Degraded),
            result("c", HealthStatus::Degraded),
            result("d", HealthStatus::Unhealthy),
        ];
        let summary = HealthSummary::from_results(&results);
        assert_eq!(summary.total, summary.healthy + summary.unhealthy + summary.degraded);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.degraded, 2);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = HealthCheckResult::healthy("database", "ok")
            .with_response_time(12)
            .with_detail("rows", 1);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["service"], "database");
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["responseTime"], 12);
        assert_eq!(json["details"]["rows"], 1);
    }
}

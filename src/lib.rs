//! Healthwatch: dependency health checks with multi-channel alerting
//!
//! Probes the services an application depends on (datastore, cache, external
//! APIs, memory, application invariants), reduces the results to one report
//! and raises alerts through independent delivery channels when a result
//! crosses a trigger rule.
//!
//! # Features
//!
//! - **Concurrent probes**: every check runs at once and never fails the run
//! - **Trigger rules**: unhealthy, degraded and slow-response alerts
//! - **Isolated channels**: webhook, email, Slack and Discord delivered as settled results
//! - **Alert lifecycle**: active, acknowledged, resolved
//! - **HTTP surface**: health endpoint with 503 on failure, alert management routes
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use healthwatch::alerts::{AlertConfig, AlertEngine};
//! use healthwatch::health::{HealthChecker, HealthConfig};
//! use healthwatch::monitor::Monitor;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let checker = HealthChecker::from_config(HealthConfig::from_env()?);
//! let engine = AlertEngine::from_config(AlertConfig::from_env()?);
//! let monitor = Monitor::new(Arc::new(checker), Arc::new(engine));
//!
//! let report = monitor.run_health_checks_with_alerting(false).await;
//! println!("{}: {:?}", report.status, report.summary);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod health;
pub mod http;
pub mod monitor;
pub mod telemetry;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use alerts::{Alert, AlertConfig, AlertEngine, AlertSeverity, AlertStatus, AlertType};
pub use health::{HealthCheckResponse, HealthCheckResult, HealthChecker, HealthConfig, HealthStatus};
pub use monitor::{Monitor, MonitorWorker};

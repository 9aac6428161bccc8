//! Health checks with alerting as a side effect, on demand or on a timer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::alerts::AlertEngine;
use crate::health::{HealthCheckResponse, HealthChecker};

/// Pipes every health report through the alert engine
pub struct Monitor {
    checker: Arc<HealthChecker>,
    engine: Arc<AlertEngine>,
}

impl Monitor {
    pub fn new(checker: Arc<HealthChecker>, engine: Arc<AlertEngine>) -> Self {
        Self { checker, engine }
    }

    pub fn checker(&self) -> &Arc<HealthChecker> {
        &self.checker
    }

    pub fn engine(&self) -> &Arc<AlertEngine> {
        &self.engine
    }

    /// Run the full (or quick) check, raise alerts for it and hand the report
    /// back untouched.
    pub async fn run_health_checks_with_alerting(&self, quick: bool) -> HealthCheckResponse {
        let response = if quick {
            self.checker.run_quick_check().await
        } else {
            self.checker.run_all_checks().await
        };

        let reports = self.engine.process(&response).await;
        if !reports.is_empty() {
            tracing::debug!(
                alerts = reports.len(),
                quick,
                "Alerts raised from health check"
            );
        }

        response
    }
}

/// Periodic full check with alerting
pub struct MonitorWorker {
    monitor: Arc<Monitor>,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl MonitorWorker {
    pub fn new(monitor: Arc<Monitor>, interval: Duration) -> Self {
        Self {
            monitor,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the background worker
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!(interval = ?self.interval, "Health monitor started");

            let mut interval = time::interval(self.interval);

            while self.running.load(Ordering::SeqCst) {
                interval.tick().await;
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }

                let response = self.monitor.run_health_checks_with_alerting(false).await;
                tracing::debug!(status = %response.status, "Scheduled health check complete");
            }

            tracing::info!("Health monitor stopped");
        })
    }

    /// Stop after the current run
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

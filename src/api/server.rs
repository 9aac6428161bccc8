use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    acknowledge_alert, active_alerts, health_check, list_alerts, liveness, resolve_alert,
    AppState,
};
use crate::config::{self, ConfigError, Lookup};
use crate::monitor::{Monitor, MonitorWorker};

/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Seconds between scheduled checks; 0 disables the background monitor
    pub check_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            check_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&config::env_lookup)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: config::string(lookup, "HEALTHWATCH_HOST").unwrap_or(defaults.host),
            port: config::parsed(lookup, "HEALTHWATCH_PORT", defaults.port)?,
            check_interval_secs: config::parsed(
                lookup,
                "HEALTH_CHECK_INTERVAL_SECS",
                defaults.check_interval_secs,
            )?,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.host, self.port);
        raw.parse().map_err(|_| ConfigError::Address(raw))
    }
}

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        // Alerts
        .route("/alerts", get(list_alerts))
        .route("/alerts/active", get(active_alerts))
        .route("/alerts/:id/acknowledge", post(acknowledge_alert))
        .route("/alerts/:id/resolve", post(resolve_alert))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server and, when an interval is set, the scheduled monitor
pub async fn run_server(
    config: ServerConfig,
    monitor: Arc<Monitor>,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.addr()?;

    let worker = (config.check_interval_secs > 0).then(|| {
        Arc::new(MonitorWorker::new(
            Arc::clone(&monitor),
            Duration::from_secs(config.check_interval_secs),
        ))
    });
    let worker_handle = worker.as_ref().map(|w| Arc::clone(w).start());
    if worker.is_none() {
        tracing::info!("Scheduled health checks disabled");
    }

    let app = build_router(Arc::new(AppState { monitor }));

    tracing::info!("Starting healthwatch server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(worker))
        .await?;

    if let Some(handle) = worker_handle {
        handle.abort();
    }

    tracing::info!("healthwatch server stopped");
    Ok(())
}

async fn shutdown_signal(worker: Option<Arc<MonitorWorker>>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, stopping monitor...");
    if let Some(worker) = worker {
        worker.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{AlertConfig, AlertEngine, AlertStore};
    use crate::config::map_lookup;
    use crate::health::{
        Datastore, HealthChecker, HealthConfig, MemorySample, MemorySampler, ProbeError,
        ReadOutcome,
    };
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::util::ServiceExt;

    struct UpDatastore;

    #[async_trait]
    impl Datastore for UpDatastore {
        async fn bounded_read(&self, _table: &str, _limit: usize) -> Result<ReadOutcome, ProbeError> {
            Ok(ReadOutcome { row_count: None })
        }

        async fn table_exists(&self, _table: &str) -> Result<bool, ProbeError> {
            Ok(true)
        }
    }

    struct IdleMemory;

    impl MemorySampler for IdleMemory {
        fn sample(&self) -> Result<MemorySample, ProbeError> {
            Ok(MemorySample {
                process_bytes: 10,
                total_bytes: 1000,
            })
        }
    }

    fn create_test_app(checker: HealthChecker) -> (Router, Arc<Monitor>) {
        let engine = AlertEngine::new(
            AlertConfig::default(),
            Arc::new(AlertStore::new()),
            Vec::new(),
        );
        let monitor = Arc::new(Monitor::new(Arc::new(checker), Arc::new(engine)));
        let app = build_router(Arc::new(AppState {
            monitor: Arc::clone(&monitor),
        }));
        (app, monitor)
    }

    fn unconfigured() -> HealthChecker {
        HealthChecker::new(HealthConfig::default().with_environment("test"))
    }

    async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_liveness_healthy() {
        let (app, _) = create_test_app(unconfigured().with_datastore(Arc::new(UpDatastore)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-cache, no-store, must-revalidate"
        );
    }

    #[tokio::test]
    async fn test_unhealthy_is_503() {
        let (app, _) = create_test_app(unconfigured());

        let (status, body) = send(&app, "GET", "/health?quick=true").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["checks"].as_array().unwrap().len(), 1);
        assert_eq!(body["checks"][0]["service"], "database");
        assert_eq!(body["summary"]["unhealthy"], 1);
    }

    #[tokio::test]
    async fn test_quick_flag_accepts_numeric() {
        let (app, _) = create_test_app(unconfigured().with_datastore(Arc::new(UpDatastore)));

        let (status, body) = send(&app, "GET", "/health?quick=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"].as_array().unwrap().len(), 1);

        let (_, body) = send(&app, "GET", "/health?quick=0").await;
        assert_eq!(body["checks"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_degraded_is_200() {
        // no cache and no external services: both report degraded
        let checker = unconfigured()
            .with_datastore(Arc::new(UpDatastore))
            .with_memory_sampler(Arc::new(IdleMemory))
            .with_env_lookup(|_| Some("set".to_string()));
        let (app, _) = create_test_app(checker);

        let (status, body) = send(&app, "GET", "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["summary"]["unhealthy"], 0);
        assert_eq!(body["summary"]["degraded"], 2);
    }

    #[tokio::test]
    async fn test_invalid_quick_flag_is_rejected() {
        let (app, _) = create_test_app(unconfigured());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health?quick=maybe")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_alert_lifecycle_routes() {
        let (app, monitor) = create_test_app(unconfigured());

        send(&app, "GET", "/health/live").await;

        let (status, body) = send(&app, "GET", "/alerts/active").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        let id = body["alerts"][0]["id"].as_str().unwrap().to_string();
        assert_eq!(body["alerts"][0]["severity"], "critical");

        let (status, body) = send(&app, "POST", &format!("/alerts/{}/acknowledge", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "acknowledged");

        let (status, _) = send(&app, "POST", &format!("/alerts/{}/acknowledge", id)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, "POST", &format!("/alerts/{}/resolve", id)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "resolved");

        let (status, body) = send(&app, "POST", "/alerts/alert_0_unknown/resolve").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("alert_0_unknown"));

        let (_, body) = send(&app, "GET", "/alerts").await;
        assert_eq!(body["count"], 1);
        let (_, body) = send(&app, "GET", "/alerts/active").await;
        assert_eq!(body["count"], 0);
        assert_eq!(monitor.engine().history().len(), 1);
    }

    #[test]
    fn test_server_config_from_lookup() {
        let lookup = map_lookup(&[
            ("HEALTHWATCH_PORT", "9090"),
            ("HEALTH_CHECK_INTERVAL_SECS", "0"),
        ]);
        let config = ServerConfig::from_lookup(&lookup).unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9090);
        assert_eq!(config.check_interval_secs, 0);
        assert_eq!(config.addr().unwrap().port(), 9090);
    }

    #[test]
    fn test_server_config_rejects_bad_port() {
        let lookup = map_lookup(&[("HEALTHWATCH_PORT", "eighty")]);
        assert!(matches!(
            ServerConfig::from_lookup(&lookup),
            Err(ConfigError::Invalid { .. })
        ));

        let config = ServerConfig {
            host: "not a host".to_string(),
            ..ServerConfig::default()
        };
        assert!(matches!(config.addr(), Err(ConfigError::Address(_))));
    }
}

//! Healthwatch Server
//!
//! Run with: cargo run
//!
//! Environment variables (a `.env` file is loaded when present):
//! - HEALTHWATCH_HOST: Bind address (default: 0.0.0.0)
//! - HEALTHWATCH_PORT: Port number (default: 8080)
//! - HEALTH_CHECK_INTERVAL_SECS: Scheduled check interval, 0 to disable (default: 60)
//! - APP_ENV / ENVIRONMENT: Deployment environment (default: development)
//! - APP_VERSION: Version reported by the health endpoint
//! - RUST_LOG: Log filter (default: healthwatch=info,tower_http=info)
//! - LOG_FORMAT: json or pretty (default: json in production)
//!
//! Dependencies probed:
//! - DATASTORE_URL, DATASTORE_API_KEY, HEALTH_PROBE_TABLE
//! - CACHE_URL (or REDIS_URL)
//! - IDENTITY_HEALTH_URL, STORAGE_LIST_URL, PAYMENT_API_KEY, EMAIL_API_KEY
//!
//! Alerting:
//! - ALERTS_ENABLED, ALERT_WEBHOOK_URL, ALERT_EMAIL_RECIPIENTS, ALERT_EMAIL_FROM
//! - SLACK_WEBHOOK_URL + SLACK_ALERTS_ENABLED, DISCORD_WEBHOOK_URL + DISCORD_ALERTS_ENABLED
//! - ALERT_RESPONSE_TIME_THRESHOLD_MS (default: 5000)

use std::sync::Arc;

use healthwatch::alerts::{AlertConfig, AlertEngine};
use healthwatch::api::{run_server, ServerConfig};
use healthwatch::health::{HealthChecker, HealthConfig};
use healthwatch::monitor::Monitor;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let health_config = HealthConfig::from_env()?;
    healthwatch::telemetry::init(&health_config.environment);

    let server_config = ServerConfig::from_env()?;
    let alert_config = AlertConfig::from_env()?;

    tracing::info!("Healthwatch configuration:");
    tracing::info!("  Host: {}:{}", server_config.host, server_config.port);
    tracing::info!(
        "  Environment: {} (version {})",
        health_config.environment,
        health_config.version
    );
    tracing::info!(
        "  Check interval: {} seconds",
        server_config.check_interval_secs
    );
    tracing::info!(
        "  Datastore: {}",
        health_config.datastore_url.as_deref().unwrap_or("not configured")
    );
    tracing::info!(
        "  Cache: {}",
        if health_config.cache_url.is_some() { "configured" } else { "not configured" }
    );

    let checker = HealthChecker::from_config(health_config);
    let engine = AlertEngine::from_config(alert_config);

    if engine.config().enabled {
        let channels = engine.notifier().enabled_channels();
        tracing::info!("  Alerting: ENABLED ({} channels)", channels.len());
        for channel in &channels {
            tracing::info!("    - {}", channel);
        }
        tracing::info!(
            "  Response time threshold: {} ms",
            engine.config().thresholds.response_time_ms
        );
    } else {
        tracing::info!("  Alerting: DISABLED");
    }

    let monitor = Arc::new(Monitor::new(Arc::new(checker), Arc::new(engine)));

    run_server(server_config, monitor).await
}

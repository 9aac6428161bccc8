use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::sync::Arc;

use crate::alerts::{Alert, AlertError};
use crate::health::HealthCheckResponse;
use crate::monitor::Monitor;

/// Application state shared across handlers
pub struct AppState {
    pub monitor: Arc<Monitor>,
}

// ============================================================================
// Health
// ============================================================================

const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

#[derive(Debug, Default, Deserialize)]
pub struct HealthQuery {
    /// `true`/`1`/`yes`/`on` or their negatives
    #[serde(default, deserialize_with = "truthy")]
    pub quick: bool,
}

fn truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        other => Err(de::Error::custom(format!("invalid boolean: {}", other))),
    }
}

/// 200 for healthy or degraded, 503 for unhealthy; never cached
fn health_response(report: HealthCheckResponse) -> Response {
    let status = if report.is_unhealthy() {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (status, [(header::CACHE_CONTROL, NO_CACHE)], Json(report)).into_response()
}

pub async fn health_check(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HealthQuery>,
) -> Response {
    let report = state
        .monitor
        .run_health_checks_with_alerting(query.quick)
        .await;
    health_response(report)
}

pub async fn liveness(State(state): State<Arc<AppState>>) -> Response {
    let report = state.monitor.run_health_checks_with_alerting(true).await;
    health_response(report)
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
    pub count: usize,
}

impl From<Vec<Alert>> for AlertsResponse {
    fn from(alerts: Vec<Alert>) -> Self {
        Self {
            count: alerts.len(),
            alerts,
        }
    }
}

pub async fn list_alerts(State(state): State<Arc<AppState>>) -> Json<AlertsResponse> {
    Json(state.monitor.engine().history().into())
}

pub async fn active_alerts(State(state): State<Arc<AppState>>) -> Json<AlertsResponse> {
    Json(state.monitor.engine().active_alerts().into())
}

pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    let alert = state.monitor.engine().acknowledge(&id)?;
    Ok(Json(alert))
}

pub async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Alert>, ApiError> {
    let alert = state.monitor.engine().resolve(&id)?;
    Ok(Json(alert))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
}

impl From<AlertError> for ApiError {
    fn from(e: AlertError) -> Self {
        match e {
            AlertError::NotFound(_) => ApiError::NotFound(e.to_string()),
            AlertError::InvalidTransition { .. } => ApiError::Conflict(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

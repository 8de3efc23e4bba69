//! Health Check Endpoints
//!
//! - /health/ping - Simple liveness check
//! - /health/live - Process alive check
//! - /health/ready - Remote parameter store health
//! - /health/flags - Flag override store health
//!
//! Readiness reflects the remote tier tracker only. The service keeps
//! answering while degraded, so a 503 here tells load balancers that answers
//! are currently fallbacks.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use stackpro_core::FlagHealth;
use stackpro_resolve::HealthSnapshot;

use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HealthDetails>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthDetails {
    pub degraded: bool,
    pub remote: HealthSnapshot,
    pub cache_entries: usize,
    pub version: String,
    pub uptime_seconds: u64,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /health/ping
pub async fn ping() -> impl IntoResponse {
    (StatusCode::OK, "pong")
}

/// GET /health/live
pub async fn liveness() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        message: Some("Process is alive".to_string()),
        details: None,
    };
    (StatusCode::OK, Json(response))
}

/// GET /health/ready
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let remote = state.resolvers.remote_health();
    let degraded = remote.is_degraded();

    let (status, status_code) = if degraded {
        (HealthStatus::Degraded, StatusCode::SERVICE_UNAVAILABLE)
    } else {
        (HealthStatus::Healthy, StatusCode::OK)
    };

    let message = remote
        .last_error
        .clone()
        .filter(|_| degraded)
        .map(|e| format!("Remote parameter store failing: {}", e));

    let response = HealthResponse {
        status,
        message,
        details: Some(HealthDetails {
            degraded,
            remote,
            cache_entries: state.resolvers.cache_stats().size,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.uptime_seconds(),
        }),
    };

    (status_code, Json(response))
}

/// GET /health/flags
///
/// Always 200; the report itself carries the status.
pub async fn flag_health(State(state): State<AppState>) -> Json<FlagHealth> {
    Json(state.resolvers.check_flag_health().await)
}

// ============================================================================
// ROUTER
// ============================================================================

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/ping", get(ping))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/flags", get(flag_health))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Healthy,
            message: None,
            details: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "healthy" }));
    }
}

//! STACKPRO API - HTTP surface for capability and flag resolution
//!
//! Thin axum layer over [`stackpro_resolve::Resolvers`]. Handlers validate
//! input, delegate, and translate degraded answers into 503 responses that
//! still carry the fallback value.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

use axum::{middleware, routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use state::AppState;

/// Assemble the full router.
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .nest("/health", routes::health::create_router())
        .nest("/v1/capabilities", routes::capability::create_router())
        .nest("/v1/flags", routes::flag::create_router())
        .nest("/admin", routes::admin::create_router())
        .route("/metrics", get(telemetry::metrics_handler))
        .route_layer(middleware::from_fn(telemetry::metrics_middleware))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

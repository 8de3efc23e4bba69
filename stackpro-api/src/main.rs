//! STACKPRO API Server Entry Point
//!
//! Reads resolver and listener configuration from the environment, wires the
//! resolver bundle with Prometheus recording, and serves until Ctrl-C.

use std::sync::Arc;

use stackpro_api::telemetry::{init_tracing, PrometheusObserver, TelemetryConfig, METRICS};
use stackpro_api::{create_router, ApiError, ApiResult, AppState, ServerConfig};
use stackpro_core::ResolverConfig;
use stackpro_resolve::Resolvers;

#[tokio::main]
async fn main() -> ApiResult<()> {
    init_tracing(&TelemetryConfig::default())?;

    if let Err(e) = METRICS.as_ref() {
        tracing::error!(error = %e, "Metrics registration failed, continuing without metrics");
    }

    let resolver_config = ResolverConfig::from_env()?;
    let resolvers = Resolvers::configured(resolver_config)?
        .observer(Arc::new(PrometheusObserver))
        .build();
    tracing::info!(
        product = %resolvers.config().product,
        cache_ttl_ms = resolvers.config().cache_ttl.as_millis() as u64,
        remote_timeout_ms = resolvers.config().remote_timeout.as_millis() as u64,
        "Resolvers ready"
    );

    let server_config = ServerConfig::from_env()?;
    let app = create_router(AppState::new(Arc::new(resolvers)), &server_config);

    let addr = server_config.bind_addr;
    tracing::info!(%addr, "Starting STACKPRO API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

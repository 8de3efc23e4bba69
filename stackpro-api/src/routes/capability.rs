//! Capability resolution and discovery endpoints.
//!
//! Both endpoints always return a usable body. A degraded answer is served
//! with 503 so callers can tell a fallback from a configured value.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use stackpro_core::{CapabilityId, Environment, ResolutionSource};
use tracing::debug;

use super::{parse_capability, parse_context, parse_environment};
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CapabilityQuery {
    pub environment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefinitionQuery {
    pub environment: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityUrlResponse {
    pub capability: CapabilityId,
    pub environment: Environment,
    pub url: String,
    pub source: ResolutionSource,
    pub degraded: bool,
}

fn status_for(degraded: bool) -> StatusCode {
    if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

/// GET /v1/capabilities/:capability?environment=
pub async fn resolve_capability(
    State(state): State<AppState>,
    Path(capability): Path<String>,
    Query(query): Query<CapabilityQuery>,
) -> ApiResult<impl IntoResponse> {
    let capability = parse_capability(&capability)?;
    let environment = parse_environment(query.environment.as_deref())?;

    let result = state
        .resolvers
        .resolve_capability(&capability, environment)
        .await;
    debug!(
        capability = %capability,
        environment = %environment,
        source = %result.source,
        degraded = result.degraded,
        "Capability resolved"
    );

    let response = CapabilityUrlResponse {
        capability,
        environment,
        url: result.value,
        source: result.source,
        degraded: result.degraded,
    };
    Ok((status_for(response.degraded), Json(response)))
}

/// GET /v1/capabilities/:capability/definition?environment=&tenant_id=&client_id=
pub async fn describe_capability(
    State(state): State<AppState>,
    Path(capability): Path<String>,
    Query(query): Query<DefinitionQuery>,
) -> ApiResult<impl IntoResponse> {
    let capability = parse_capability(&capability)?;
    let environment = parse_environment(query.environment.as_deref())?;
    let context = parse_context(query.tenant_id.as_deref(), query.client_id.as_deref())?;

    let definition = state
        .resolvers
        .describe_capability(&capability, environment, &context)
        .await;

    Ok((status_for(definition.degraded), Json(definition)))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/:capability", get(resolve_capability))
        .route("/:capability/definition", get(describe_capability))
}

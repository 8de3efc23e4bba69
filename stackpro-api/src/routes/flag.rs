//! Tenant flag endpoints.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use stackpro_core::{FlagKey, FlagResult};

use super::{parse_context, parse_flag};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlagQuery {
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchFlagQuery {
    /// Comma-separated flag keys.
    pub keys: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
}

/// Split a comma-separated key list. Empty segments are skipped; at least
/// one key is required.
fn parse_keys(raw: Option<&str>) -> ApiResult<Vec<FlagKey>> {
    let keys = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_flag)
        .collect::<ApiResult<Vec<_>>>()?;
    if keys.is_empty() {
        return Err(ApiError::missing_field("keys"));
    }
    Ok(keys)
}

/// GET /v1/flags/:flag?tenant_id=&client_id=
pub async fn resolve_flag(
    State(state): State<AppState>,
    Path(flag): Path<String>,
    Query(query): Query<FlagQuery>,
) -> ApiResult<Json<FlagResult>> {
    let flag = parse_flag(&flag)?;
    let context = parse_context(query.tenant_id.as_deref(), query.client_id.as_deref())?;

    Ok(Json(state.resolvers.resolve_tenant_flag(&flag, &context).await))
}

/// GET /v1/flags?keys=a,b&tenant_id=&client_id=
pub async fn resolve_flags(
    State(state): State<AppState>,
    Query(query): Query<BatchFlagQuery>,
) -> ApiResult<Json<BTreeMap<FlagKey, FlagResult>>> {
    let keys = parse_keys(query.keys.as_deref())?;
    let context = parse_context(query.tenant_id.as_deref(), query.client_id.as_deref())?;

    Ok(Json(state.resolvers.resolve_tenant_flags(&keys, &context).await))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(resolve_flags))
        .route("/:flag", get(resolve_flag))
}

//! Administrative cache endpoints.

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use stackpro_core::ResolutionKey;
use stackpro_storage::CacheStats;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearCacheResponse {
    pub removed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub removed: bool,
}

/// GET /admin/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.resolvers.cache_stats())
}

/// POST /admin/cache/clear
pub async fn clear_cache(State(state): State<AppState>) -> Json<ClearCacheResponse> {
    let removed = state.resolvers.clear_cache();
    Json(ClearCacheResponse { removed })
}

/// DELETE /admin/cache/entries/:key
///
/// `key` is an encoded resolution key such as `capability:messaging:sandbox`
/// or `flag:beta_dashboard:tenant:acme`.
pub async fn invalidate_entry(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<InvalidateResponse>> {
    let decoded = ResolutionKey::decode(&key)
        .ok_or_else(|| ApiError::invalid_format("key", "an encoded resolution key"))?;

    let removed = state.resolvers.invalidate(&decoded);
    info!(key = %decoded, removed, "Cache entry invalidated");
    Ok(Json(InvalidateResponse { removed }))
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", post(clear_cache))
        .route("/cache/entries/:key", delete(invalidate_entry))
}

//! HTTP behavior of the router, driven in-process with `oneshot`.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use proptest::prelude::*;
use serde_json::Value;
use stackpro_api::{create_router, AppState, ServerConfig};
use stackpro_core::Environment;
use stackpro_resolve::MapOverrides;
use stackpro_test_utils::fixtures::{harness_with, test_config, Harness};
use stackpro_test_utils::FakeParameterStore;
use tower::ServiceExt;

const MESSAGING_URL: &str = "https://messaging.internal.example";

struct TestApp {
    router: Router,
    overrides: Arc<MapOverrides>,
    store: Arc<FakeParameterStore>,
}

fn app() -> TestApp {
    app_with(FakeParameterStore::new().with_capability(
        "messaging",
        Environment::Sandbox,
        MESSAGING_URL,
    ))
}

fn app_with(store: FakeParameterStore) -> TestApp {
    let Harness {
        resolvers,
        overrides,
        store,
        ..
    } = harness_with(test_config(), store);
    let router = create_router(
        AppState::new(Arc::new(resolvers)),
        &ServerConfig::default(),
    );
    TestApp {
        router,
        overrides,
        store,
    }
}

async fn send(router: &Router, method: Method, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(router, Method::GET, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// ============================================================================
// HEALTH
// ============================================================================

#[tokio::test]
async fn ping_returns_pong() {
    let app = app();
    let (status, body) = send(&app.router, Method::GET, "/health/ping").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"pong");
}

#[tokio::test]
async fn liveness_is_healthy() {
    let app = app();
    let (status, json) = get_json(&app.router, "/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn readiness_turns_503_when_remote_fails() {
    let app = app();
    let (status, json) = get_json(&app.router, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["details"]["degraded"], false);

    app.store.go_down();
    get_json(&app.router, "/v1/capabilities/billing?environment=sandbox").await;

    let (status, json) = get_json(&app.router, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["details"]["degraded"], true);
    assert_eq!(json["details"]["remote"]["consecutive_failures"], 1);
}

// ============================================================================
// CAPABILITIES
// ============================================================================

#[tokio::test]
async fn capability_url_from_remote() {
    let app = app();
    let (status, json) =
        get_json(&app.router, "/v1/capabilities/messaging?environment=sandbox").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["capability"], "messaging");
    assert_eq!(json["environment"], "sandbox");
    assert_eq!(json["url"], MESSAGING_URL);
    assert_eq!(json["source"], "remote");
    assert_eq!(json["degraded"], false);
}

#[tokio::test]
async fn capability_override_reports_global_source() {
    let app = app();
    app.overrides
        .set("CAP_MESSAGING_BASE_URL", "https://msg.example.com");

    let (status, json) =
        get_json(&app.router, "/v1/capabilities/messaging?environment=sandbox").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["url"], "https://msg.example.com");
    assert_eq!(json["source"], "global");
    assert_eq!(app.store.calls(), 0);
}

#[tokio::test]
async fn degraded_capability_is_503_with_fallback_body() {
    let app = app();
    app.store.go_down();

    let (status, json) =
        get_json(&app.router, "/v1/capabilities/messaging?environment=sandbox").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["url"], "/api");
    assert_eq!(json["source"], "default");
    assert_eq!(json["degraded"], true);
}

#[tokio::test]
async fn capability_requires_environment() {
    let app = app();
    let (status, json) = get_json(&app.router, "/v1/capabilities/messaging").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "MISSING_FIELD");
    assert_eq!(json["details"]["field"], "environment");
}

#[tokio::test]
async fn capability_rejects_bad_input() {
    let app = app();

    let (status, json) =
        get_json(&app.router, "/v1/capabilities/messaging?environment=staging").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_INPUT");
    assert_eq!(json["details"]["field"], "environment");

    let (status, json) =
        get_json(&app.router, "/v1/capabilities/Messaging?environment=sandbox").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"]["field"], "capability");
}

#[tokio::test]
async fn capability_definition_for_enabled_tenant() {
    let app = app();
    app.overrides.set("messaging_enabled:tenant:acme", "true");

    let (status, json) = get_json(
        &app.router,
        "/v1/capabilities/messaging/definition?environment=sandbox&tenant_id=acme",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], "messaging");
    assert_eq!(json["enabled"], true);
    assert_eq!(json["baseUrl"], MESSAGING_URL);
    assert_eq!(json["health"], "healthy");
}

#[tokio::test]
async fn capability_definition_for_disabled_tenant() {
    let app = app();

    let (status, json) = get_json(
        &app.router,
        "/v1/capabilities/messaging/definition?environment=sandbox&tenant_id=globex",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["enabled"], false);
    assert_eq!(json["baseUrl"], Value::Null);
    assert_eq!(json["health"], "unknown");
}

// ============================================================================
// FLAGS
// ============================================================================

#[tokio::test]
async fn flag_resolution_follows_tenant_precedence() {
    let app = app();
    app.overrides.set("beta_dashboard:tenant:acme", "true");
    app.overrides.set("beta_dashboard", "false");

    let (status, json) =
        get_json(&app.router, "/v1/flags/beta_dashboard?tenant_id=acme&client_id=web").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], true);
    assert_eq!(json["source"], "tenant");
    assert_eq!(json["degraded"], false);

    let (_, json) = get_json(&app.router, "/v1/flags/beta_dashboard?tenant_id=globex").await;
    assert_eq!(json["value"], false);
    assert_eq!(json["source"], "global");
}

#[tokio::test]
async fn flag_variant_is_returned_as_string() {
    let app = app();
    app.overrides.set("checkout_flow", "canary");

    let (_, json) = get_json(&app.router, "/v1/flags/checkout_flow").await;
    assert_eq!(json["value"], "canary");
    assert_eq!(json["source"], "global");
}

#[tokio::test]
async fn unknown_flag_defaults_to_false() {
    let app = app();
    let (status, json) = get_json(&app.router, "/v1/flags/never_set").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], false);
    assert_eq!(json["source"], "default");
}

#[tokio::test]
async fn batch_flags_returns_map() {
    let app = app();
    app.overrides.set("beta_dashboard:tenant:acme", "true");

    let (status, json) = get_json(
        &app.router,
        "/v1/flags?keys=beta_dashboard,jwt_auth_allowed&tenant_id=acme",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let map = json.as_object().unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(json["beta_dashboard"]["source"], "tenant");
    assert_eq!(json["jwt_auth_allowed"]["value"], true);
    assert_eq!(json["jwt_auth_allowed"]["source"], "default");
}

#[tokio::test]
async fn batch_flags_requires_keys() {
    let app = app();
    let (status, json) = get_json(&app.router, "/v1/flags").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"]["field"], "keys");
}

#[tokio::test]
async fn flag_health_reports_stub() {
    let app = app();
    let (status, json) = get_json(&app.router, "/health/flags").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["healthy"], true);
    assert_eq!(json["stub"], true);
}

#[tokio::test]
async fn flag_named_health_is_resolvable() {
    let app = app();
    app.overrides.set("health:tenant:acme", "true");

    let (status, json) = get_json(&app.router, "/v1/flags/health?tenant_id=acme").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["value"], true);
    assert_eq!(json["source"], "tenant");
}

#[tokio::test]
async fn invalid_tenant_is_rejected() {
    let app = app();
    let (status, json) = get_json(&app.router, "/v1/flags/beta?tenant_id=a:b").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["details"]["field"], "tenant_id");
}

// ============================================================================
// ADMIN
// ============================================================================

#[tokio::test]
async fn cache_stats_and_clear() {
    let app = app();
    get_json(&app.router, "/v1/capabilities/messaging?environment=sandbox").await;
    get_json(&app.router, "/v1/flags/beta_dashboard").await;

    let (status, json) = get_json(&app.router, "/admin/cache/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["size"], 2);
    assert_eq!(
        json["keys"],
        serde_json::json!(["capability:messaging:sandbox", "flag:beta_dashboard"])
    );

    let (status, body) = send(&app.router, Method::POST, "/admin/cache/clear").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["removed"], 2);

    let (_, json) = get_json(&app.router, "/admin/cache/stats").await;
    assert_eq!(json["size"], 0);

    let (_, json) = get_json(&app.router, "/v1/capabilities/messaging?environment=sandbox").await;
    assert_eq!(json["source"], "remote");
    assert_eq!(app.store.calls(), 2);
}

#[tokio::test]
async fn invalidate_single_entry() {
    let app = app();
    app.overrides.set("beta_dashboard:tenant:acme", "true");
    get_json(&app.router, "/v1/flags/beta_dashboard?tenant_id=acme").await;
    get_json(&app.router, "/v1/flags/beta_dashboard").await;

    let (status, body) = send(
        &app.router,
        Method::DELETE,
        "/admin/cache/entries/flag:beta_dashboard:tenant:acme",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["removed"], true);

    let (_, json) = get_json(&app.router, "/admin/cache/stats").await;
    assert_eq!(json["keys"], serde_json::json!(["flag:beta_dashboard"]));

    let (_, body) = send(
        &app.router,
        Method::DELETE,
        "/admin/cache/entries/flag:beta_dashboard:tenant:acme",
    )
    .await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["removed"], false);
}

#[tokio::test]
async fn invalidate_rejects_undecodable_key() {
    let app = app();
    let (status, body) = send(&app.router, Method::DELETE, "/admin/cache/entries/bogus:key").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["code"], "INVALID_FORMAT");
}

#[tokio::test]
async fn metrics_endpoint_exposes_resolution_counters() {
    let app = app();
    let (status, body) = send(&app.router, Method::GET, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("stackpro_cache_entries"));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn malformed_capability_ids_are_400(name in "[A-Z][A-Za-z0-9]{0,8}") {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let app = app_with(FakeParameterStore::new());
        let uri = format!("/v1/capabilities/{}?environment=sandbox", name);

        let (status, _) = runtime.block_on(send(&app.router, Method::GET, &uri));
        prop_assert_eq!(status, StatusCode::BAD_REQUEST);
        prop_assert_eq!(app.store.calls(), 0);
    }
}

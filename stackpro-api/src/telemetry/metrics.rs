//! Prometheus Metrics Definitions
//!
//! Defines all STACKPRO metrics with their labels and exposes `/metrics`
//! for Prometheus scraping. Resolution counters are fed by
//! [`PrometheusObserver`], which the server plugs into the resolver bundle.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use stackpro_core::{ResolutionKind, ResolutionSource};
use stackpro_resolve::ResolutionObserver;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<StackproMetrics>> = Lazy::new(StackproMetrics::new);

/// Container for all STACKPRO metrics.
#[derive(Clone)]
pub struct StackproMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Finished resolutions - labels: kind, source
    pub resolutions_total: CounterVec,

    /// Resolutions that ended degraded - labels: kind
    pub degraded_total: CounterVec,

    /// Remote parameter store lookups - labels: outcome
    pub remote_lookups_total: CounterVec,

    /// Live entries in the resolution cache
    pub cache_entries: Gauge,
}

impl StackproMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "stackpro_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "stackpro_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            resolutions_total: register_counter_vec!(
                "stackpro_resolutions_total",
                "Total number of finished resolutions",
                &["kind", "source"]
            )
            .map_err(|e| registration_error("resolutions_total", e))?,

            degraded_total: register_counter_vec!(
                "stackpro_degraded_total",
                "Resolutions served while a source was failing",
                &["kind"]
            )
            .map_err(|e| registration_error("degraded_total", e))?,

            remote_lookups_total: register_counter_vec!(
                "stackpro_remote_lookups_total",
                "Remote parameter store lookups by outcome",
                &["outcome"]
            )
            .map_err(|e| registration_error("remote_lookups_total", e))?,

            cache_entries: register_gauge!(
                "stackpro_cache_entries",
                "Current number of live resolution cache entries"
            )
            .map_err(|e| registration_error("cache_entries", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn record_resolution(&self, kind: ResolutionKind, source: ResolutionSource, degraded: bool) {
        self.resolutions_total
            .with_label_values(&[kind.as_str(), source.as_str()])
            .inc();
        if degraded {
            self.degraded_total.with_label_values(&[kind.as_str()]).inc();
        }
    }

    pub fn record_remote_lookup(&self, outcome: &str) {
        self.remote_lookups_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn set_cache_entries(&self, count: usize) {
        self.cache_entries.set(count as f64);
    }
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

/// Feeds resolver callbacks into [`METRICS`].
///
/// Silently records nothing if metric registration failed; the failure is
/// reported once at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusObserver;

impl ResolutionObserver for PrometheusObserver {
    fn on_lookup(&self, _kind: ResolutionKind, tier: ResolutionSource, outcome: &'static str) {
        if tier != ResolutionSource::Remote {
            return;
        }
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_remote_lookup(outcome);
        }
    }

    fn on_resolved(&self, kind: ResolutionKind, source: ResolutionSource, degraded: bool) {
        if let Ok(metrics) = METRICS.as_ref() {
            metrics.record_resolution(kind, source, degraded);
        }
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics. The cache gauge is sampled at
/// scrape time.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    if let Ok(metrics) = METRICS.as_ref() {
        metrics.set_cache_entries(state.resolvers.cache_stats().size);
    }

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}

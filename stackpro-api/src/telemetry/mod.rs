//! STACKPRO Telemetry
//!
//! Structured JSON logging and Prometheus metrics for the HTTP surface.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, PrometheusObserver, StackproMetrics, METRICS};
pub use middleware::metrics_middleware;
pub use tracer::{init_tracing, LogFormat, TelemetryConfig};

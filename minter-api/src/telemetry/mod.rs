//! Minter Telemetry - Observability Infrastructure
//!
//! OpenTelemetry tracing and Prometheus metrics for the HTTP layer.
//! Works standalone; an OTLP collector is only used when configured.

pub mod metrics;
pub mod middleware;
pub mod tracer;

pub use metrics::{metrics_handler, MinterMetrics, METRICS};
pub use middleware::observability_middleware;
pub use tracer::{init_tracer, shutdown_tracer, TelemetryConfig};

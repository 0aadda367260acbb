//! Prometheus Metrics Definitions
//!
//! Registers the service's metrics on the default registry and exposes them
//! at `/metrics` for scraping.

use axum::{http::StatusCode, response::IntoResponse};
use minter_storage::BackfillReport;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Database operation latency buckets (seconds)
const DB_LATENCY_BUCKETS: &[f64] =
    &[0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0];

/// Global metrics instance - initialized on first use
pub static METRICS: Lazy<ApiResult<MinterMetrics>> = Lazy::new(MinterMetrics::new);

/// The registered metrics, or `None` if registration failed.
pub fn get() -> Option<&'static MinterMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all Minter metrics.
#[derive(Clone)]
pub struct MinterMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Record store operation counter - labels: operation, entity, status
    pub db_operations_total: CounterVec,

    /// Record store operation duration histogram - labels: operation, entity
    pub db_operation_duration_seconds: HistogramVec,

    /// Remote pages fetched during backfill - labels: network
    pub backfill_pages_total: CounterVec,

    /// Records processed during backfill - labels: network, outcome
    pub backfill_records_total: CounterVec,

    /// Backfill runs - labels: network, result (noop, complete, aborted, failed)
    pub backfill_runs_total: CounterVec,

    /// IPFS uploads - labels: provider, kind, status
    pub ipfs_uploads_total: CounterVec,
}

fn registration_error(name: &str, e: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, e))
}

impl MinterMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "minter_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "minter_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            db_operations_total: register_counter_vec!(
                "minter_db_operations_total",
                "Total number of record store operations",
                &["operation", "entity", "status"]
            )
            .map_err(|e| registration_error("db_operations_total", e))?,

            db_operation_duration_seconds: register_histogram_vec!(
                "minter_db_operation_duration_seconds",
                "Record store operation duration in seconds",
                &["operation", "entity"],
                DB_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("db_operation_duration_seconds", e))?,

            backfill_pages_total: register_counter_vec!(
                "minter_backfill_pages_total",
                "Remote pages fetched while backfilling",
                &["network"]
            )
            .map_err(|e| registration_error("backfill_pages_total", e))?,

            backfill_records_total: register_counter_vec!(
                "minter_backfill_records_total",
                "Records processed while backfilling",
                &["network", "outcome"]
            )
            .map_err(|e| registration_error("backfill_records_total", e))?,

            backfill_runs_total: register_counter_vec!(
                "minter_backfill_runs_total",
                "Backfill runs by result",
                &["network", "result"]
            )
            .map_err(|e| registration_error("backfill_runs_total", e))?,

            ipfs_uploads_total: register_counter_vec!(
                "minter_ipfs_uploads_total",
                "IPFS uploads by provider, kind and status",
                &["provider", "kind", "status"]
            )
            .map_err(|e| registration_error("ipfs_uploads_total", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status_str.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a record store operation.
    pub fn record_db_operation(
        &self,
        operation: &str,
        entity: &str,
        success: bool,
        duration_secs: f64,
    ) {
        let status = if success { "success" } else { "error" };
        self.db_operations_total
            .with_label_values(&[operation, entity, status])
            .inc();
        self.db_operation_duration_seconds
            .with_label_values(&[operation, entity])
            .observe(duration_secs);
    }

    /// Record what one backfill run did. `aborted` marks a run cut short
    /// by a page failure.
    pub fn record_backfill(&self, report: &BackfillReport, aborted: bool) {
        let network = report.collection.network.as_str();
        let result = if aborted {
            "aborted"
        } else if report.is_noop() {
            "noop"
        } else {
            "complete"
        };

        self.backfill_runs_total
            .with_label_values(&[network, result])
            .inc();
        self.backfill_pages_total
            .with_label_values(&[network])
            .inc_by(report.fetched_pages as f64);
        self.backfill_records_total
            .with_label_values(&[network, "inserted"])
            .inc_by(report.inserted as f64);
        self.backfill_records_total
            .with_label_values(&[network, "failed"])
            .inc_by(report.failed() as f64);
    }

    /// Record a backfill run that failed before fetching any page.
    pub fn record_backfill_failure(&self, network: &str) {
        self.backfill_runs_total
            .with_label_values(&[network, "failed"])
            .inc();
    }

    /// Record an IPFS upload.
    pub fn record_ipfs_upload(&self, provider: &str, kind: &str, success: bool) {
        let status = if success { "success" } else { "error" };
        self.ipfs_uploads_total
            .with_label_values(&[provider, kind, status])
            .inc();
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // Make sure our collectors exist even before the first request.
    let _ = get();

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

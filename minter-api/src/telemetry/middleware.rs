//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request with a server span (continuing any incoming W3C
//! `traceparent`), a request id, Prometheus metrics and a completion log.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use once_cell::sync::Lazy;
use opentelemetry::{global, Context};
use opentelemetry_http::HeaderExtractor;
use regex::Regex;
use std::time::Instant;
use tracing::{field, info_span, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use super::metrics;

/// Header carrying the per-request id, echoed on the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

static COLLECTION_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/(cached-bigmap|cached-collection)/[^/]+/[^/]+/?$")
        .expect("Invalid collection route regex")
});

static NUMERIC_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").expect("Invalid ID regex"));

/// Extract trace context from incoming request headers.
fn extract_trace_context(headers: &HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

/// Normalize path for metrics/spans so labels stay low-cardinality.
fn normalize_path(path: &str) -> String {
    if let Some(caps) = COLLECTION_ROUTE.captures(path) {
        return format!("/{}/{{network}}/{{id}}", &caps[1]);
    }
    NUMERIC_ID.replace_all(path, "/{id}$1").to_string()
}

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::now_v7().to_string())
}

/// Observability middleware for Axum.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);
    let request_id = request_id(request.headers());
    let parent_context = extract_trace_context(request.headers());

    let span = info_span!(
        "http_request",
        otel.name = %format!("{} {}", method, normalized_path),
        otel.kind = "server",
        otel.status_code = field::Empty,
        http.method = %method,
        http.target = %path,
        http.route = %normalized_path,
        http.status_code = field::Empty,
        request_id = %request_id,
    );
    let _ = span.set_parent(parent_context);

    let mut response = next.run(request).instrument(span.clone()).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Some(metrics) = metrics::get() {
        metrics.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    span.record("http.status_code", status.as_u16());
    span.record(
        "otel.status_code",
        if status.is_server_error() || status.is_client_error() {
            "ERROR"
        } else {
            "OK"
        },
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    tracing::info!(
        parent: &span,
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}

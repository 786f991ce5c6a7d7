//! Prometheus metrics for the API server.
//!
//! Pipeline series (`recut_trims_total`, `recut_trim_strategy_total`,
//! `recut_tool_duration_seconds`) are recorded by recut-media through the
//! same global recorder.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "recut_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "recut_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "recut_http_requests_in_flight";

    pub const RATE_LIMIT_HITS_TOTAL: &str = "recut_rate_limit_hits_total";
}

/// Routes served by this API; anything else is labelled `other`.
const KNOWN_PATHS: &[&str] = &["/trim", "/process", "/health", "/ready", "/metrics"];

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", sanitize_path(endpoint).to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Bound label cardinality: unknown paths collapse to one value.
fn sanitize_path(path: &str) -> &str {
    let trimmed = path.strip_suffix('/').filter(|p| !p.is_empty()).unwrap_or(path);
    KNOWN_PATHS
        .iter()
        .copied()
        .find(|known| *known == trimmed)
        .unwrap_or("other")
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

//! Metrics definitions for the reports service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `reports_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 4 values (`/reports`, `/health`, `/metrics`, `/other`)
//! - `outcome`: 3 values (authenticated, rejected, error)
//! - `reason`: one per rejection reason plus `none`
//! - `status`: `success` or one label per key set error variant

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("reports_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // A cold fetch is bounded by the fetch timeout (max 25s)
        .set_buckets_for_metric(
            Matcher::Prefix("reports_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `reports_http_requests_total`, `reports_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures every response, including 404/405 produced by the router.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("reports_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("reports_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path to a bounded label. Unknown paths become `/other`.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/reports" | "/reports/" => "/reports",
        "/health" => "/health",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record one verification outcome
///
/// Metric: `reports_auth_decisions_total`
/// Labels: `outcome`, `reason`
pub fn record_auth_decision(outcome: &'static str, reason: &'static str) {
    counter!("reports_auth_decisions_total",
        "outcome" => outcome,
        "reason" => reason
    )
    .increment(1);
}

/// Record one underlying key set fetch
///
/// Metric: `reports_jwks_fetch_total`, `reports_jwks_fetch_duration_seconds`
/// Labels: `status`
///
/// Called once per fetch, not once per caller that joined it.
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("reports_jwks_fetch_duration_seconds",
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("reports_jwks_fetch_total",
        "status" => status
    )
    .increment(1);
}

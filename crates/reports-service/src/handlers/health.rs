//! Health check handler.

use crate::routes::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Response for `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,

    /// Whether the signing key set has been fetched yet.
    pub key_set_cached: bool,
}

/// Liveness probe.
///
/// Always reports healthy. A cold key cache is normal until the first
/// authenticated request and does not fail the probe.
#[instrument(skip_all, name = "reports.handlers.health")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        key_set_cached: state.verifier.key_sets().is_cached(),
    })
}

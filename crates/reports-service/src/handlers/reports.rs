//! Reports handler.
//!
//! Returns the prosthesis usage report for the authenticated user. Report
//! content is static; only the identity fields come from the token.

use crate::auth::Identity;
use axum::{http::StatusCode, Extension, Json};
use serde::Serialize;
use tracing::instrument;

/// Response for `GET /reports`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    /// Token subject.
    pub user_id: String,

    /// `preferred_username`; serialized as `null` when the token had none.
    pub username: Option<String>,

    pub report_type: &'static str,
    pub period: &'static str,
    pub summary: &'static str,
    pub details: ReportDetails,
    pub disclaimer: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDetails {
    pub total_movements: u64,
    pub average_reaction_time_ms: u32,
    pub battery_cycles: u32,
    pub last_calibration_date: &'static str,
    pub prosthesis_model: &'static str,
}

impl ReportResponse {
    /// Prosthesis usage report for `identity`.
    pub fn prosthesis_usage(identity: Identity) -> Self {
        Self {
            user_id: identity.subject,
            username: identity.username,
            report_type: "ProsthesisUsage",
            period: "Last Month",
            summary: "This is a hardcoded report for your prosthesis usage.",
            details: ReportDetails {
                total_movements: 12345,
                average_reaction_time_ms: 95,
                battery_cycles: 30,
                last_calibration_date: "2023-10-26",
                prosthesis_model: "BionicPRO X-200",
            },
            disclaimer: "This report is for informational purposes only.",
        }
    }
}

/// Handler for GET /reports
///
/// Requires the auth middleware, which inserts the [`Identity`].
///
/// ## Response
///
/// ```json
/// {
///   "userId": "u1",
///   "username": "adam",
///   "reportType": "ProsthesisUsage",
///   "period": "Last Month",
///   "summary": "...",
///   "details": { "totalMovements": 12345, ... },
///   "disclaimer": "..."
/// }
/// ```
#[instrument(skip_all, name = "reports.handlers.reports")]
pub async fn get_report(Extension(identity): Extension<Identity>) -> Json<ReportResponse> {
    if identity.username.is_none() {
        tracing::warn!(
            target: "reports.handlers.reports",
            "Token has no preferred_username, report username will be null"
        );
    }

    tracing::debug!(target: "reports.handlers.reports", "Returning prosthesis usage report");

    Json(ReportResponse::prosthesis_usage(identity))
}

/// Handler for OPTIONS /reports
///
/// Preflight requests carry no credentials; CORS headers are added by the
/// CORS layer.
pub async fn reports_preflight() -> StatusCode {
    StatusCode::OK
}

//! Reports service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl.
//! Messages returned to clients are generic; the cause is logged server-side.

use crate::auth::RejectionReason;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Value of the `WWW-Authenticate` header on 401 responses.
pub const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"reports\", error=\"invalid_token\"";

/// Reports service error type.
///
/// Maps to HTTP status codes:
/// - Unauthorized: 401 Unauthorized
/// - KeySourceUnavailable: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(RejectionReason),

    #[error("Signing keys unavailable")]
    KeySourceUnavailable,
}

impl From<RejectionReason> for ApiError {
    fn from(reason: RejectionReason) -> Self {
        match reason {
            RejectionReason::KeySourceUnavailable => ApiError::KeySourceUnavailable,
            reason => ApiError::Unauthorized(reason),
        }
    }
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::KeySourceUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The rejection reason reported in the response body.
    fn reason(&self) -> RejectionReason {
        match self {
            ApiError::Unauthorized(reason) => *reason,
            ApiError::KeySourceUnavailable => RejectionReason::KeySourceUnavailable,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let reason = self.reason();

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: reason.code(),
                message: reason.message(),
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
            );
        }

        response
    }
}

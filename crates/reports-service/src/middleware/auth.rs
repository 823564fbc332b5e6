//! Authentication middleware for protected routes.
//!
//! Hands the `Authorization` header to the [`TokenVerifier`] and either
//! injects the verified [`Identity`] into request extensions or
//! short-circuits with the matching [`ApiError`].

use crate::auth::{Identity, RejectionReason, TokenVerifier};
use crate::errors::ApiError;
use crate::observability::metrics;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, Method},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub verifier: Arc<TokenVerifier>,
}

/// Authentication middleware that verifies bearer tokens.
///
/// # Authorization Header Format
///
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// # Response
///
/// - `OPTIONS` requests pass through without authentication (CORS preflight)
/// - 401 Unauthorized with WWW-Authenticate header for client-caused rejections
/// - 500 Internal Server Error if the signing keys cannot be fetched
/// - Otherwise continues to the handler with [`Identity`] in extensions
#[instrument(skip(state, req, next), name = "reports.middleware.auth")]
pub async fn require_auth(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let header = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(value) => Some(value.to_owned()),
            Err(_) => {
                tracing::debug!(target: "reports.middleware.auth", "Authorization header is not visible ASCII");
                let reason = RejectionReason::MalformedHeader;
                metrics::record_auth_decision("rejected", reason.label());
                return Err(reason.into());
            }
        },
    };

    let identity = state.verifier.verify(header.as_deref()).await.into_result()?;

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// Extension trait for reading the verified identity from a request.
pub trait IdentityExt {
    /// Returns `None` if the auth middleware was not applied to this request.
    fn identity(&self) -> Option<&Identity>;
}

impl<B> IdentityExt for axum::http::Request<B> {
    fn identity(&self) -> Option<&Identity> {
        self.extensions().get::<Identity>()
    }
}

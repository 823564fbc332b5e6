//! Middleware for the reports service.
//!
//! # Components
//!
//! - `auth` - Bearer token authentication for protected routes
//! - `http_metrics` - Request/response metrics for every route

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, AuthState, IdentityExt};
pub use http_metrics::http_metrics_middleware;

//! BionicPRO Reports Service Library
//!
//! Serves prosthesis usage reports to users authenticated by the Keycloak
//! realm. Every request to `/reports` carries a bearer token that is
//! verified against the realm's signing keys.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/verifier.rs -> auth/cache.rs -> auth/jwks.rs
//!                                     -> handlers/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `auth` - Key set cache and token verification
//! - `middleware` - Authentication and HTTP metrics middleware
//! - `handlers` - HTTP request handlers
//! - `observability` - Metrics definitions
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;

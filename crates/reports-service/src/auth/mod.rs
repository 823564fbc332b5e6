//! Authentication module for the reports service.
//!
//! Verifies Keycloak-issued bearer tokens against the realm's JWKS.
//!
//! # Components
//!
//! - `jwks` - Key set model and the key sources that fetch it
//! - `cache` - Process-wide, single-flight key set cache
//! - `claims` - Token claims and the authenticated identity
//! - `decision` - Verification outcome and rejection reasons
//! - `verifier` - Bearer token verification pipeline

pub mod cache;
pub mod claims;
pub mod decision;
pub mod jwks;
pub mod verifier;

pub use cache::KeySetCache;
pub use claims::{Identity, TokenClaims};
pub use decision::{AuthDecision, RejectionReason};
pub use jwks::{HttpKeySource, KeySetError, KeySource, SigningKeySet, StaticKeySource};
pub use verifier::{TokenVerifier, ValidationPolicy};

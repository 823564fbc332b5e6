//! JWT utilities shared across BionicPRO services.
//!
//! This module provides:
//! - Size limits for DoS prevention
//! - Clock skew constants for `exp`/`nbf` leeway
//! - The single signing algorithm accepted from the identity provider
//! - Key ID extraction from JWT headers, with algorithm enforcement
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RS256 is accepted; `none`, HMAC and every other algorithm are
//!   rejected before a key is ever selected (algorithm-confusion prevention)
//! - Error messages are generic; details are logged at debug level
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::extract_kid;
//!
//! // Rejects oversized, malformed, non-RS256 and kid-less tokens
//! let kid = extract_kid(token)?;
//! let key = key_set.get(&kid).ok_or(...)?;
//! ```

use jsonwebtoken::{decode_header, Algorithm};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Keycloak access tokens are typically 1-2KB.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default JWT clock skew tolerance applied to `exp` and `nbf`.
///
/// Zero: a token is expired the second its `exp` passes.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(0);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// The only algorithm accepted for access tokens.
pub const ALLOWED_ALGORITHM: Algorithm = Algorithm::RS256;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while inspecting an unverified JWT header.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid")]
    MalformedToken,

    /// Token header declares an algorithm other than [`ALLOWED_ALGORITHM`].
    #[error("The access token is invalid")]
    DisallowedAlgorithm,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid")]
    MissingKid,
}

// =============================================================================
// Functions
// =============================================================================

/// Extract the `kid` (key ID) from a JWT header without verifying the signature.
///
/// The declared algorithm is checked here as well, so a token announcing
/// `none` or `HS256` never reaches key selection.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the token signature
/// - The `kid` value should only be used for lookup in a trusted key set
///
/// # Errors
///
/// Returns `JwtValidationError` variants:
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Wrong structure, bad base64, invalid header JSON,
///   or an algorithm name the JWT library does not know (including `none`)
/// - `DisallowedAlgorithm` - A known algorithm other than RS256
/// - `MissingKid` - Header has no `kid`, or it is empty
pub fn extract_kid(token: &str) -> Result<String, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts = token.split('.').count();
    if parts != 3 {
        tracing::debug!(
            target: "common.jwt",
            parts = parts,
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header = decode_header(token).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header");
        JwtValidationError::MalformedToken
    })?;

    if header.alg != ALLOWED_ALGORITHM {
        tracing::debug!(
            target: "common.jwt",
            alg = ?header.alg,
            "Token rejected: algorithm not allowed"
        );
        return Err(JwtValidationError::DisallowedAlgorithm);
    }

    header
        .kid
        .filter(|kid| !kid.is_empty())
        .ok_or(JwtValidationError::MissingKid)
}

// =============================================================================
// Tests
// =============================================================================

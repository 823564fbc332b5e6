//! Bearer token verification.
//!
//! Turns a raw `Authorization` header value into an [`AuthDecision`]:
//!
//! 1. Presence check
//! 2. Scheme check (`Bearer`, case-insensitive)
//! 3. Key set acquisition from the [`KeySetCache`]
//! 4. Size, structure, algorithm and signature verification
//! 5. Audience, issuer, expiry and not-before validation
//!
//! # Security
//!
//! - Only RS256 is accepted, checked on the unverified header before key
//!   selection and again by the signature validation
//! - Tokens must name a `kid` present in the cached key set; an unknown
//!   `kid` does not trigger a refetch
//! - Client-facing messages are generic; the specific reason is logged at debug

use crate::auth::cache::KeySetCache;
use crate::auth::claims::TokenClaims;
use crate::auth::decision::{AuthDecision, RejectionReason};
use crate::auth::jwks::SigningKeySet;
use crate::config::Config;
use crate::observability::metrics;
use common::jwt::{extract_kid, ALLOWED_ALGORITHM, DEFAULT_CLOCK_SKEW};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Expected token claims for this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    pub expected_audience: String,
    pub expected_issuer: String,
    /// Leeway applied to `exp` and `nbf`.
    pub clock_skew: Duration,
}

impl ValidationPolicy {
    pub fn new(expected_audience: impl Into<String>, expected_issuer: impl Into<String>) -> Self {
        Self {
            expected_audience: expected_audience.into(),
            expected_issuer: expected_issuer.into(),
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }

    pub fn with_clock_skew(mut self, clock_skew: Duration) -> Self {
        self.clock_skew = clock_skew;
        self
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.expected_audience.clone(), config.expected_issuer())
            .with_clock_skew(Duration::from_secs(config.jwt_clock_skew_seconds))
    }

    /// Build the `jsonwebtoken` validation rules for this policy.
    pub fn validation(&self) -> Validation {
        let mut validation = Validation::new(ALLOWED_ALGORITHM);
        validation.leeway = self.clock_skew.as_secs();
        // Inclusive: rejected only once `exp < now - leeway`.
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_audience(&[self.expected_audience.as_str()]);
        validation.set_issuer(&[self.expected_issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation
    }
}

/// Verifies bearer tokens against the cached signing key set.
pub struct TokenVerifier {
    key_sets: Arc<KeySetCache>,
    policy: ValidationPolicy,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(key_sets: Arc<KeySetCache>, policy: ValidationPolicy) -> Self {
        let validation = policy.validation();
        Self {
            key_sets,
            policy,
            validation,
        }
    }

    pub fn from_config(config: &Config, key_sets: Arc<KeySetCache>) -> Self {
        Self::new(key_sets, ValidationPolicy::from_config(config))
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn key_sets(&self) -> &KeySetCache {
        &self.key_sets
    }

    /// Verify the value of an `Authorization` header.
    ///
    /// Never fails: every problem is reported as `AuthDecision::Rejected`.
    /// Only the first call on a cold cache performs network I/O.
    #[instrument(skip_all)]
    pub async fn verify(&self, header: Option<&str>) -> AuthDecision {
        let decision = self.decide(header).await;

        match &decision {
            AuthDecision::Authenticated(_) => {
                tracing::debug!(target: "reports.auth.verifier", "Token verified");
                metrics::record_auth_decision(decision.outcome(), "none");
            }
            AuthDecision::Rejected(reason) => {
                tracing::debug!(
                    target: "reports.auth.verifier",
                    reason = reason.code(),
                    "Request rejected"
                );
                metrics::record_auth_decision(decision.outcome(), reason.label());
            }
        }

        decision
    }

    async fn decide(&self, header: Option<&str>) -> AuthDecision {
        let credential = match parse_authorization(header) {
            Ok(credential) => credential,
            Err(reason) => return AuthDecision::Rejected(reason),
        };

        let key_set = match self.key_sets.get().await {
            Ok(key_set) => key_set,
            Err(e) => {
                tracing::warn!(
                    target: "reports.auth.verifier",
                    error = %e,
                    "Signing keys unavailable"
                );
                return AuthDecision::Rejected(RejectionReason::KeySourceUnavailable);
            }
        };

        match verify_credential(credential, &key_set, &self.validation) {
            Ok(claims) => AuthDecision::Authenticated(claims.into()),
            Err(reason) => AuthDecision::Rejected(reason),
        }
    }
}

/// Split an `Authorization` header into scheme and credential.
///
/// The header is split on the first run of whitespace. An empty header is
/// treated the same as an absent one.
///
/// # Errors
///
/// - `MissingHeader` - absent or blank header
/// - `MalformedHeader` - no whitespace between scheme and credential
/// - `UnsupportedScheme` - scheme other than `Bearer`
pub fn parse_authorization(header: Option<&str>) -> Result<&str, RejectionReason> {
    let header = header
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or(RejectionReason::MissingHeader)?;

    let (scheme, credential) = header
        .split_once(char::is_whitespace)
        .ok_or(RejectionReason::MalformedHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(RejectionReason::UnsupportedScheme);
    }

    Ok(credential.trim_start())
}

/// Verify a compact JWT against `key_set` and return its claims.
///
/// # Errors
///
/// - `InvalidSignature` - oversized, malformed, wrong algorithm, missing or
///   unknown `kid`, or signature mismatch
/// - `Expired` - `exp` is in the past (beyond the leeway)
/// - `ClaimMismatch` - audience, issuer, `nbf` or a required claim is wrong
pub fn verify_credential(
    token: &str,
    key_set: &SigningKeySet,
    validation: &Validation,
) -> Result<TokenClaims, RejectionReason> {
    let kid = extract_kid(token).map_err(|e| {
        tracing::debug!(target: "reports.auth.verifier", error = ?e, "Token header rejected");
        RejectionReason::InvalidSignature
    })?;

    let key = key_set.get(&kid).ok_or_else(|| {
        tracing::debug!(target: "reports.auth.verifier", kid = %kid, "Token signed with unknown key");
        RejectionReason::InvalidSignature
    })?;

    let token_data = decode::<TokenClaims>(token, key.decoding_key(), validation).map_err(|e| {
        tracing::debug!(target: "reports.auth.verifier", error = %e, "Token validation failed");
        rejection_for(e.kind())
    })?;

    if token_data.claims.sub.is_empty() {
        tracing::debug!(target: "reports.auth.verifier", "Token has empty subject");
        return Err(RejectionReason::ClaimMismatch);
    }

    Ok(token_data.claims)
}

fn rejection_for(kind: &ErrorKind) -> RejectionReason {
    match kind {
        ErrorKind::ExpiredSignature => RejectionReason::Expired,
        ErrorKind::ImmatureSignature
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidSubject
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::Json(_) => RejectionReason::ClaimMismatch,
        _ => RejectionReason::InvalidSignature,
    }
}

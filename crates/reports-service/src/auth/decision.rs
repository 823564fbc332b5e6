//! Outcome of verifying one request's credentials.

use super::claims::Identity;
use std::fmt;

/// Why a request was not authenticated.
///
/// Every variant except [`RejectionReason::KeySourceUnavailable`] is caused
/// by the client and answered with 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionReason {
    MissingHeader,
    MalformedHeader,
    UnsupportedScheme,
    InvalidSignature,
    ClaimMismatch,
    Expired,
    KeySourceUnavailable,
}

impl RejectionReason {
    pub const ALL: [RejectionReason; 7] = [
        RejectionReason::MissingHeader,
        RejectionReason::MalformedHeader,
        RejectionReason::UnsupportedScheme,
        RejectionReason::InvalidSignature,
        RejectionReason::ClaimMismatch,
        RejectionReason::Expired,
        RejectionReason::KeySourceUnavailable,
    ];

    /// Error code returned in the response body.
    pub fn code(self) -> &'static str {
        match self {
            RejectionReason::MissingHeader => "MISSING_HEADER",
            RejectionReason::MalformedHeader => "MALFORMED_HEADER",
            RejectionReason::UnsupportedScheme => "UNSUPPORTED_SCHEME",
            RejectionReason::InvalidSignature => "INVALID_SIGNATURE",
            RejectionReason::ClaimMismatch => "CLAIM_MISMATCH",
            RejectionReason::Expired => "TOKEN_EXPIRED",
            RejectionReason::KeySourceUnavailable => "KEY_SOURCE_UNAVAILABLE",
        }
    }

    /// Metric label.
    pub fn label(self) -> &'static str {
        match self {
            RejectionReason::MissingHeader => "missing_header",
            RejectionReason::MalformedHeader => "malformed_header",
            RejectionReason::UnsupportedScheme => "unsupported_scheme",
            RejectionReason::InvalidSignature => "invalid_signature",
            RejectionReason::ClaimMismatch => "claim_mismatch",
            RejectionReason::Expired => "expired",
            RejectionReason::KeySourceUnavailable => "key_source_unavailable",
        }
    }

    /// Client-facing message. Deliberately coarse for token failures.
    pub fn message(self) -> &'static str {
        match self {
            RejectionReason::MissingHeader => "Authorization header is missing",
            RejectionReason::MalformedHeader => "Authorization header is malformed",
            RejectionReason::UnsupportedScheme => "Authorization scheme must be Bearer",
            RejectionReason::InvalidSignature => "The access token is invalid",
            RejectionReason::ClaimMismatch => "The access token was not issued for this service",
            RejectionReason::Expired => "The access token has expired",
            RejectionReason::KeySourceUnavailable => "Authentication is temporarily unavailable",
        }
    }

    pub fn is_server_error(self) -> bool {
        matches!(self, RejectionReason::KeySourceUnavailable)
    }

    /// HTTP status code for this reason.
    pub fn status_code(self) -> u16 {
        if self.is_server_error() {
            500
        } else {
            401
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of [`TokenVerifier::verify`](super::verifier::TokenVerifier::verify).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Authenticated(Identity),
    Rejected(RejectionReason),
}

impl AuthDecision {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthDecision::Authenticated(_))
    }

    /// The rejection reason, if any.
    pub fn rejection(&self) -> Option<RejectionReason> {
        match self {
            AuthDecision::Authenticated(_) => None,
            AuthDecision::Rejected(reason) => Some(*reason),
        }
    }

    /// Convert into a `Result`, for `?` at the boundary layer.
    pub fn into_result(self) -> Result<Identity, RejectionReason> {
        match self {
            AuthDecision::Authenticated(identity) => Ok(identity),
            AuthDecision::Rejected(reason) => Err(reason),
        }
    }

    /// Outcome label for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            AuthDecision::Authenticated(_) => "authenticated",
            AuthDecision::Rejected(reason) if reason.is_server_error() => "error",
            AuthDecision::Rejected(_) => "rejected",
        }
    }
}

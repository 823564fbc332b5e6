//! Access token claims and the identity derived from them.
//!
//! The `sub` field is redacted in Debug output to prevent exposure in logs.
//! Every field has a serde default: presence of the required claims is
//! enforced by the validator, which reports a missing claim as a claim
//! mismatch rather than a parse failure.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The `aud` claim: Keycloak emits a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Default for Audience {
    fn default() -> Self {
        Audience::Many(Vec::new())
    }
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Audience::One(value) => value == audience,
            Audience::Many(values) => values.iter().any(|v| v == audience),
        }
    }
}

/// Decoded payload of a verified access token.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id) - redacted in Debug output.
    #[serde(default)]
    pub sub: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,

    #[serde(default)]
    pub aud: Audience,

    #[serde(default)]
    pub iss: String,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default)]
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenClaims")
            .field("sub", &"[REDACTED]")
            .field("preferred_username", &self.preferred_username)
            .field("aud", &self.aud)
            .field("iss", &self.iss)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .finish()
    }
}

/// The authenticated caller, attached to request extensions.
///
/// `username` is `None` when the token carried no `preferred_username`;
/// handlers report that state instead of inventing a default.
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub username: Option<String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>, username: Option<String>) -> Self {
        Self {
            subject: subject.into(),
            username,
        }
    }
}

impl From<TokenClaims> for Identity {
    fn from(claims: TokenClaims) -> Self {
        Self {
            subject: claims.sub,
            username: claims.preferred_username,
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("subject", &"[REDACTED]")
            .field("username", &self.username)
            .finish()
    }
}

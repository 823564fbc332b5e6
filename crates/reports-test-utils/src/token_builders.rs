//! Builder patterns for test tokens
//!
//! Defaults describe a valid Keycloak access token for the test realm:
//! `sub` "u1", `preferred_username` "adam", `aud` "reports-client",
//! `iss` "https://idp/realms/demo", expiring one hour from now.

use crate::crypto_fixtures::{FixtureError, TestKeyPair};
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Identity provider base URL used by test configuration.
pub const TEST_ISSUER_BASE_URL: &str = "https://idp";

/// Realm used by test configuration.
pub const TEST_REALM: &str = "demo";

/// Client ID (expected audience) used by test configuration.
pub const TEST_AUDIENCE: &str = "reports-client";

/// `iss` matching [`TEST_ISSUER_BASE_URL`] and [`TEST_REALM`].
pub const TEST_ISSUER: &str = "https://idp/realms/demo";

/// Builder for test access token claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("u2")
///     .with_username("eve")
///     .expires_in(60)
///     .sign(&TestKeyPair::primary())?;
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("u1"));
        claims.insert("preferred_username".to_string(), json!("adam"));
        claims.insert("aud".to_string(), json!(TEST_AUDIENCE));
        claims.insert("iss".to_string(), json!(TEST_ISSUER));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert("typ".to_string(), json!("Bearer"));
        Self { claims }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set `preferred_username`
    pub fn with_username(self, username: &str) -> Self {
        self.with_claim("preferred_username", json!(username))
    }

    /// Remove `preferred_username`
    pub fn without_username(self) -> Self {
        self.without_claim("preferred_username")
    }

    /// Set a single-string audience
    pub fn for_audience(self, audience: &str) -> Self {
        self.with_claim("aud", json!(audience))
    }

    /// Set an array audience, as Keycloak emits when several clients are in scope
    pub fn for_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim("aud", json!(audiences))
    }

    /// Set the issuer
    pub fn issued_by(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.with_claim(
            "exp",
            json!((Utc::now() + Duration::seconds(seconds)).timestamp()),
        )
    }

    /// Set `nbf` in seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        self.with_claim(
            "nbf",
            json!((Utc::now() + Duration::seconds(seconds)).timestamp()),
        )
    }

    /// Set any claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove any claim
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Build and sign with `key`
    pub fn sign(self, key: &TestKeyPair) -> Result<String, FixtureError> {
        key.sign(&self.build())
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

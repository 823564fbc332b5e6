//! Signing key set model and the key source that fetches it.
//!
//! The identity provider publishes its public keys at
//! `{issuer}/protocol/openid-connect/certs` as a JSON Web Key Set. Only
//! RSA signing keys usable for RS256 are kept; Keycloak also publishes an
//! `RSA-OAEP` encryption key in the same document, which is skipped.
//!
//! # Security
//!
//! - A [`SigningKeySet`] is immutable once built; the cache only ever swaps
//!   whole sets
//! - A document without a single usable key is an error, never an empty set

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Default HTTP timeout for the JWKS request.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Why the signing key set could not be obtained.
///
/// Every variant is a server-side failure (`KeySourceUnavailable`). The
/// type is `Clone` so one failed fetch can be handed to every caller that
/// joined it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeySetError {
    #[error("Key source request failed: {0}")]
    Transport(String),

    #[error("Key source returned HTTP status {0}")]
    Status(u16),

    #[error("Key source returned an invalid JWKS document: {0}")]
    InvalidDocument(String),

    #[error("Key source returned no usable signing keys")]
    NoUsableKeys,

    #[error("Key source did not respond within {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl KeySetError {
    /// Bounded label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            KeySetError::Transport(_) => "transport_error",
            KeySetError::Status(_) => "http_status",
            KeySetError::InvalidDocument(_) => "invalid_document",
            KeySetError::NoUsableKeys => "no_usable_keys",
            KeySetError::Timeout(_) => "timeout",
        }
    }
}

/// JSON Web Key as published by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for signing keys we accept).
    pub kty: String,

    /// Key ID - matched against the token header `kid`.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm ("RS256" for signing keys, "RSA-OAEP" for encryption keys).
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" or "enc").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

/// One verified-usable public key.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    decoding_key: DecodingKey,
}

impl SigningKey {
    /// Key ID.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Key material for signature verification.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Build an RS256 verification key from a JWK.
    ///
    /// Returns `None` for keys that are not RSA signing keys or whose
    /// parameters are missing or undecodable.
    fn from_jwk(jwk: &Jwk) -> Option<Self> {
        let kid = jwk.kid.as_deref().filter(|kid| !kid.is_empty())?;

        if jwk.kty != "RSA" {
            tracing::debug!(target: "reports.auth.jwks", kid = %kid, kty = %jwk.kty, "Skipping non-RSA key");
            return None;
        }
        if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
            tracing::debug!(target: "reports.auth.jwks", kid = %kid, "Skipping non-signing key");
            return None;
        }
        if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            tracing::debug!(target: "reports.auth.jwks", kid = %kid, alg = ?jwk.alg, "Skipping key with other algorithm");
            return None;
        }

        let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
            tracing::warn!(target: "reports.auth.jwks", kid = %kid, "RSA key missing modulus or exponent");
            return None;
        };

        match DecodingKey::from_rsa_components(n, e) {
            Ok(decoding_key) => Some(Self {
                kid: kid.to_string(),
                decoding_key,
            }),
            Err(err) => {
                tracing::warn!(target: "reports.auth.jwks", kid = %kid, error = %err, "Invalid RSA key parameters");
                None
            }
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("alg", &"RS256")
            .finish_non_exhaustive()
    }
}

/// Immutable mapping from key ID to verification key.
#[derive(Debug, Clone)]
pub struct SigningKeySet {
    keys: HashMap<String, SigningKey>,
}

impl SigningKeySet {
    /// Build a key set from a JWKS document, keeping only RS256 signing keys.
    ///
    /// # Errors
    ///
    /// Returns `KeySetError::NoUsableKeys` if no key in the document survives filtering.
    pub fn from_document(document: &JwksDocument) -> Result<Self, KeySetError> {
        let keys: HashMap<String, SigningKey> = document
            .keys
            .iter()
            .filter_map(SigningKey::from_jwk)
            .map(|key| (key.kid.clone(), key))
            .collect();

        if keys.is_empty() {
            return Err(KeySetError::NoUsableKeys);
        }

        Ok(Self { keys })
    }

    /// Look up a key by ID.
    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.get(kid)
    }

    /// Number of keys in the set. Never zero.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key IDs, sorted.
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Where signing keys come from.
///
/// One call is one attempt; retries and caching belong to the caller.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch and parse the current key set.
    async fn fetch(&self) -> Result<SigningKeySet, KeySetError>;
}

/// Key source that always yields the same key set.
#[derive(Debug, Clone)]
pub struct StaticKeySource {
    key_set: SigningKeySet,
}

impl StaticKeySource {
    pub fn new(key_set: SigningKeySet) -> Self {
        Self { key_set }
    }
}

#[async_trait]
impl KeySource for StaticKeySource {
    async fn fetch(&self) -> Result<SigningKeySet, KeySetError> {
        Ok(self.key_set.clone())
    }
}

/// Key source backed by the identity provider's JWKS endpoint.
pub struct HttpKeySource {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a key source with the default 5 second HTTP timeout.
    pub fn new(jwks_url: String) -> Self {
        Self::with_timeout(jwks_url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a key source with a custom HTTP timeout.
    pub fn with_timeout(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "reports.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    async fn fetch(&self) -> Result<SigningKeySet, KeySetError> {
        tracing::debug!(target: "reports.auth.jwks", "Fetching JWKS from identity provider");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "reports.auth.jwks", error = %e, "Failed to fetch JWKS");
                if e.is_timeout() {
                    KeySetError::Transport("request timed out".to_string())
                } else {
                    KeySetError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(
                target: "reports.auth.jwks",
                status = %status,
                "JWKS endpoint returned error"
            );
            return Err(KeySetError::Status(status.as_u16()));
        }

        let document: JwksDocument = response.json().await.map_err(|e| {
            tracing::error!(target: "reports.auth.jwks", error = %e, "Failed to parse JWKS response");
            KeySetError::InvalidDocument(e.to_string())
        })?;

        let key_set = SigningKeySet::from_document(&document).inspect_err(|_| {
            tracing::error!(
                target: "reports.auth.jwks",
                published = document.keys.len(),
                "JWKS contains no usable RS256 signing key"
            );
        })?;

        tracing::info!(
            target: "reports.auth.jwks",
            key_count = key_set.len(),
            skipped = document.keys.len() - key_set.len(),
            "JWKS fetched"
        );

        Ok(key_set)
    }
}

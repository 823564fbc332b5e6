//! Reports service configuration.
//!
//! Configuration is loaded from environment variables once at startup.
//! Every identity-provider setting is required: a process that cannot
//! verify tokens must not start serving requests.

use axum::http::HeaderValue;
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use reqwest::Url;
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Default timeout for a single JWKS fetch, in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound for the JWKS fetch timeout, in seconds.
///
/// Must stay below the router's request timeout so a slow identity
/// provider surfaces as `KeySourceUnavailable` (500), not a 408.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 25;

/// Origins allowed to call the service from a browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    /// `*` - any origin.
    Any,

    /// An explicit allow-list.
    List(Vec<HeaderValue>),
}

/// Reports service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Identity provider base URL (e.g. `https://idp.example.com`), no trailing slash.
    pub issuer_base_url: String,

    /// Identity provider realm.
    pub realm: String,

    /// Client ID that access tokens must be issued for (`aud`).
    pub expected_audience: String,

    /// Server bind address (default: "0.0.0.0:8000").
    pub bind_address: SocketAddr,

    /// Leeway in seconds applied to `exp` and `nbf` (default: 0).
    pub jwt_clock_skew_seconds: u64,

    /// Bound on a single JWKS fetch (default: 5 seconds).
    pub jwks_fetch_timeout: Duration,

    /// CORS allowed origins (default: any).
    pub cors_allowed_origins: CorsOrigins,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid identity provider URL: {0}")]
    InvalidIssuerUrl(String),

    #[error("Invalid realm: {0}")]
    InvalidRealm(String),

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidJwksFetchTimeout(String),

    #[error("Invalid CORS origin: {0}")]
    InvalidCorsOrigin(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let issuer_base_url = parse_issuer_base_url(required(vars, "KEYCLOAK_URL")?)?;
        let realm = parse_realm(required(vars, "KEYCLOAK_REALM")?)?;
        let expected_audience = required(vars, "KEYCLOAK_CLIENT_ID")?.to_string();

        let bind_address_str = vars
            .get("BIND_ADDRESS")
            .map(String::as_str)
            .unwrap_or(DEFAULT_BIND_ADDRESS);
        let bind_address: SocketAddr = bind_address_str.parse().map_err(|e| {
            ConfigError::InvalidBindAddress(format!(
                "BIND_ADDRESS must be a socket address, got '{}': {}",
                bind_address_str, e
            ))
        })?;

        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs()
        };

        let jwks_fetch_timeout_seconds =
            if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwksFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidJwksFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_JWKS_FETCH_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS
            };

        let cors_allowed_origins = match vars.get("CORS_ALLOWED_ORIGINS") {
            Some(value) => parse_cors_origins(value)?,
            None => CorsOrigins::Any,
        };

        Ok(Config {
            issuer_base_url,
            realm,
            expected_audience,
            bind_address,
            jwt_clock_skew_seconds,
            jwks_fetch_timeout: Duration::from_secs(jwks_fetch_timeout_seconds),
            cors_allowed_origins,
        })
    }

    /// The `iss` value tokens must carry: `{issuer_base_url}/realms/{realm}`.
    pub fn expected_issuer(&self) -> String {
        format!("{}/realms/{}", self.issuer_base_url, self.realm)
    }

    /// The realm's JWKS endpoint.
    pub fn jwks_url(&self) -> String {
        format!("{}/protocol/openid-connect/certs", self.expected_issuer())
    }
}

/// Empty and whitespace-only values count as missing.
fn required<'a>(vars: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ConfigError> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn parse_issuer_base_url(value: &str) -> Result<String, ConfigError> {
    let url = Url::parse(value).map_err(|e| {
        ConfigError::InvalidIssuerUrl(format!(
            "KEYCLOAK_URL must be an absolute URL, got '{}': {}",
            value, e
        ))
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidIssuerUrl(format!(
            "KEYCLOAK_URL must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidIssuerUrl(
            "KEYCLOAK_URL must not contain a query or fragment".to_string(),
        ));
    }

    Ok(value.trim_end_matches('/').to_string())
}

fn parse_realm(value: &str) -> Result<String, ConfigError> {
    if value.contains('/') || value.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidRealm(format!(
            "KEYCLOAK_REALM must be a single path segment, got '{}'",
            value
        )));
    }

    Ok(value.to_string())
}

fn parse_cors_origins(value: &str) -> Result<CorsOrigins, ConfigError> {
    let value = value.trim();
    if value == "*" {
        return Ok(CorsOrigins::Any);
    }

    let origins = value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| {
                ConfigError::InvalidCorsOrigin(format!("'{}' is not a valid origin: {}", origin, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if origins.is_empty() {
        return Err(ConfigError::InvalidCorsOrigin(
            "CORS_ALLOWED_ORIGINS must list at least one origin or be '*'".to_string(),
        ));
    }

    Ok(CorsOrigins::List(origins))
}

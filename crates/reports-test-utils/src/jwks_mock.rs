//! Mocked identity provider JWKS endpoint
//!
//! Wraps a wiremock server that answers on the realm's
//! `/protocol/openid-connect/certs` path, so a real [`HttpKeySource`] can be
//! pointed at it.
//!
//! [`HttpKeySource`]: reports_service::auth::HttpKeySource

use crate::crypto_fixtures::{jwks_json, TestKeyPair};
use crate::token_builders::TEST_REALM;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the test realm's JWKS endpoint.
pub fn jwks_path() -> String {
    format!("/realms/{TEST_REALM}/protocol/openid-connect/certs")
}

/// Mock Keycloak serving a JWKS document.
pub struct MockKeycloak {
    server: MockServer,
}

impl MockKeycloak {
    /// Start a mock publishing `keys`.
    pub async fn start(keys: &[&TestKeyPair]) -> Self {
        let mock = Self {
            server: MockServer::start().await,
        };
        mock.serve_keys(keys).await;
        mock
    }

    /// Start a mock whose JWKS endpoint answers with `status`.
    pub async fn start_failing(status: u16) -> Self {
        let mock = Self {
            server: MockServer::start().await,
        };
        mock.serve_status(status).await;
        mock
    }

    /// Replace the served document with one publishing `keys`.
    pub async fn serve_keys(&self, keys: &[&TestKeyPair]) {
        self.serve(ResponseTemplate::new(200).set_body_json(jwks_json(keys)))
            .await;
    }

    /// Like [`serve_keys`](Self::serve_keys), but each response is delayed.
    pub async fn serve_keys_slowly(&self, keys: &[&TestKeyPair], delay: Duration) {
        self.serve(
            ResponseTemplate::new(200)
                .set_body_json(jwks_json(keys))
                .set_delay(delay),
        )
        .await;
    }

    /// Replace the served document with a bare status code.
    pub async fn serve_status(&self, status: u16) {
        self.serve(ResponseTemplate::new(status)).await;
    }

    /// Replace the served document with an arbitrary body.
    pub async fn serve_body(&self, body: &str) {
        self.serve(ResponseTemplate::new(200).set_body_string(body))
            .await;
    }

    async fn serve(&self, response: ResponseTemplate) {
        // Reset clears recorded requests too; counts restart from zero.
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(jwks_path()))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    /// `KEYCLOAK_URL` for this mock.
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Full JWKS URL for this mock.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), jwks_path())
    }

    /// Number of JWKS requests received since the last reset.
    pub async fn jwks_request_count(&self) -> usize {
        let jwks_path = jwks_path();
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path() == jwks_path)
            .count()
    }
}

//! Test server harness for E2E testing
//!
//! Provides `TestReportsServer` for spawning real reports service instances
//! in tests, wired to a [`MockKeycloak`](crate::jwks_mock::MockKeycloak) or
//! any other identity provider URL.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use reports_service::auth::{HttpKeySource, KeySetCache, TokenVerifier};
use reports_service::config::Config;
use reports_service::observability::metrics::init_metrics_recorder;
use reports_service::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

use crate::token_builders::{TEST_AUDIENCE, TEST_REALM};

/// Global metrics handle shared by all test servers in a process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the reports service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_reports_flow() -> Result<()> {
///     let keycloak = MockKeycloak::start(&[&TestKeyPair::primary()]).await;
///     let server = TestReportsServer::spawn(&keycloak.base_url()).await?;
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/reports", server.url()))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 401);
///     Ok(())
/// }
/// ```
pub struct TestReportsServer {
    addr: SocketAddr,
    config: Config,
    verifier: Arc<TokenVerifier>,
    _handle: JoinHandle<()>,
}

impl TestReportsServer {
    /// Spawn a server trusting the test realm at `keycloak_url`.
    pub async fn spawn(keycloak_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(keycloak_url, HashMap::new()).await
    }

    /// Spawn a server with extra environment variables on top of the defaults.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Use a real `HttpKeySource` against `keycloak_url`
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(
        keycloak_url: &str,
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("KEYCLOAK_URL".to_string(), keycloak_url.to_string()),
            ("KEYCLOAK_REALM".to_string(), TEST_REALM.to_string()),
            ("KEYCLOAK_CLIENT_ID".to_string(), TEST_AUDIENCE.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let key_source = Arc::new(HttpKeySource::with_timeout(
            config.jwks_url(),
            config.jwks_fetch_timeout,
        ));
        let key_sets = Arc::new(KeySetCache::new(key_source, config.jwks_fetch_timeout));
        let verifier = Arc::new(TokenVerifier::from_config(&config, key_sets));

        let state = Arc::new(AppState {
            config: config.clone(),
            verifier: Arc::clone(&verifier),
        });

        // Build routes using the service's real route builder
        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind(config.bind_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            verifier,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether the server has cached the signing key set.
    pub fn key_set_cached(&self) -> bool {
        self.verifier.key_sets().is_cached()
    }
}

impl Drop for TestReportsServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

//! Reports Service
//!
//! Entry point for the BionicPRO reports API.

use reports_service::auth::{HttpKeySource, KeySetCache, TokenVerifier};
use reports_service::config::Config;
use reports_service::observability::metrics::init_metrics_recorder;
use reports_service::routes::{self, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reports_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Reports Service");

    // Missing identity provider settings are fatal before we bind.
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        issuer = %config.expected_issuer(),
        audience = %config.expected_audience,
        bind_address = %config.bind_address,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        jwks_fetch_timeout_seconds = config.jwks_fetch_timeout.as_secs(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics: {}", e);
        e
    })?;

    // The key set is fetched on the first authenticated request, not here.
    let key_source = Arc::new(HttpKeySource::with_timeout(
        config.jwks_url(),
        config.jwks_fetch_timeout,
    ));
    let key_sets = Arc::new(KeySetCache::new(key_source, config.jwks_fetch_timeout));
    let verifier = Arc::new(TokenVerifier::from_config(&config, key_sets));

    let bind_address = config.bind_address;
    let state = Arc::new(AppState { config, verifier });
    let app = routes::build_routes(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind(bind_address).await.map_err(|e| {
        error!("Failed to bind {}: {}", bind_address, e);
        e
    })?;

    info!("Reports Service listening on {}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Reports Service shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

//! Health and metrics endpoint tests

use reports_test_utils::*;
use reqwest::StatusCode;

#[tokio::test]
async fn test_health_reports_cold_then_warm_key_cache() -> Result<(), anyhow::Error> {
    // Arrange
    let key = TestKeyPair::primary();
    let keycloak = MockKeycloak::start(&[&key]).await;
    let server = TestReportsServer::spawn(&keycloak.base_url()).await?;
    let client = reqwest::Client::new();

    // Act - before any authenticated request
    let cold: serde_json::Value = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?
        .json()
        .await?;

    // Assert
    assert_eq!(cold["status"], "healthy");
    assert_eq!(cold["key_set_cached"], false);

    // Act - one authenticated request fills the cache
    let token = TestTokenBuilder::new().sign(&key)?;
    let response = client
        .get(format!("{}/reports", server.url()))
        .bearer_auth(token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let warm: serde_json::Value = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?
        .json()
        .await?;

    // Assert
    assert_eq!(warm["key_set_cached"], true);

    Ok(())
}

#[tokio::test]
async fn test_health_is_public_while_key_source_is_down() -> Result<(), anyhow::Error> {
    let keycloak = MockKeycloak::start_failing(503).await;
    let server = TestReportsServer::spawn(&keycloak.base_url()).await?;

    let response = reqwest::get(format!("{}/health", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(keycloak.jwks_request_count().await, 0);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() -> Result<(), anyhow::Error> {
    let keycloak = MockKeycloak::start(&[&TestKeyPair::primary()]).await;
    let server = TestReportsServer::spawn(&keycloak.base_url()).await?;

    let response = reqwest::get(format!("{}/metrics", server.url())).await?;

    assert_eq!(response.status(), StatusCode::OK);

    Ok(())
}

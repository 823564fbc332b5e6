//! # Reports Test Utilities
//!
//! Shared test utilities for the reports service.
//!
//! This crate provides:
//! - Fixed RSA key pairs with matching JWKs (`TestKeyPair`)
//! - Token claim builders (`TestTokenBuilder`)
//! - A mocked Keycloak JWKS endpoint (`MockKeycloak`)
//! - Scripted in-memory key sources (`ScriptedKeySource`)
//! - Server test harness (`TestReportsServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reports_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let key = TestKeyPair::primary();
//!     let keycloak = MockKeycloak::start(&[&key]).await;
//!     let server = TestReportsServer::spawn(&keycloak.base_url()).await?;
//!
//!     let token = TestTokenBuilder::new().with_username("adam").sign(&key)?;
//!     // GET {server.url()}/reports with "Authorization: Bearer {token}"
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod fake_sources;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use fake_sources::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;

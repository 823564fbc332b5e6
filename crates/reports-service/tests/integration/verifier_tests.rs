//! Token verifier tests against real RS256 signatures
//!
//! The verifier runs over an in-memory key set, so these tests cover the
//! full verification pipeline without any HTTP in between.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use futures::future::join_all;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reports_service::auth::{
    AuthDecision, Identity, KeySetCache, KeySetError, RejectionReason, TokenVerifier,
    ValidationPolicy,
};
use reports_service::config::Config;
use reports_test_utils::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn policy() -> ValidationPolicy {
    ValidationPolicy::new(TEST_AUDIENCE, TEST_ISSUER)
}

fn verifier_trusting(keys: &[&TestKeyPair]) -> TokenVerifier {
    let cache = KeySetCache::with_key_set(key_set(keys).unwrap());
    TokenVerifier::new(Arc::new(cache), policy())
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

// ============================================================================
// Accepted tokens
// ============================================================================

#[tokio::test]
async fn test_valid_token_yields_subject_and_username() {
    // Arrange
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = TestTokenBuilder::new()
        .for_user("u1")
        .with_username("adam")
        .sign(&key)
        .unwrap();

    // Act
    let decision = verifier.verify(Some(&bearer(&token))).await;

    // Assert
    assert_eq!(
        decision,
        AuthDecision::Authenticated(Identity::new("u1", Some("adam".to_string())))
    );
}

/// The worked example: config `{reports-client, https://idp, demo}`,
/// token for u1/adam expiring in an hour.
#[tokio::test]
async fn test_worked_example_from_keycloak_config() {
    let key = TestKeyPair::primary();
    let vars: HashMap<String, String> = [
        ("KEYCLOAK_URL", TEST_ISSUER_BASE_URL),
        ("KEYCLOAK_REALM", TEST_REALM),
        ("KEYCLOAK_CLIENT_ID", TEST_AUDIENCE),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    let config = Config::from_vars(&vars).unwrap();
    let verifier = TokenVerifier::from_config(
        &config,
        Arc::new(KeySetCache::with_key_set(key.key_set().unwrap())),
    );

    let token = TestTokenBuilder::new().sign(&key).unwrap();
    assert!(token.starts_with("eyJ"));

    let decision = verifier.verify(Some(&bearer(&token))).await;

    assert_eq!(
        decision.into_result(),
        Ok(Identity::new("u1", Some("adam".to_string())))
    );
}

#[tokio::test]
async fn test_scheme_is_case_insensitive() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = TestTokenBuilder::new().sign(&key).unwrap();

    for scheme in ["bearer", "BEARER", "bEaReR"] {
        let decision = verifier.verify(Some(&format!("{scheme} {token}"))).await;
        assert!(decision.is_authenticated(), "scheme {scheme:?}");
    }
}

#[tokio::test]
async fn test_missing_username_is_reported_as_none() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = TestTokenBuilder::new()
        .without_username()
        .sign(&key)
        .unwrap();

    let identity = verifier
        .verify(Some(&bearer(&token)))
        .await
        .into_result()
        .unwrap();

    assert_eq!(identity.subject, "u1");
    assert_eq!(identity.username, None);
}

#[tokio::test]
async fn test_audience_array_containing_client_is_accepted() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = TestTokenBuilder::new()
        .for_audiences(&["account", TEST_AUDIENCE])
        .sign(&key)
        .unwrap();

    assert!(verifier.verify(Some(&bearer(&token))).await.is_authenticated());
}

#[tokio::test]
async fn test_rotated_key_in_published_set_is_accepted() {
    let primary = TestKeyPair::primary();
    let secondary = TestKeyPair::secondary();
    let verifier = verifier_trusting(&[&primary, &secondary]);
    let token = TestTokenBuilder::new()
        .for_user("u2")
        .sign(&secondary)
        .unwrap();

    let identity = verifier
        .verify(Some(&bearer(&token)))
        .await
        .into_result()
        .unwrap();

    assert_eq!(identity.subject, "u2");
}

#[tokio::test]
async fn test_expiry_within_clock_skew_is_accepted() {
    let key = TestKeyPair::primary();
    let cache = KeySetCache::with_key_set(key.key_set().unwrap());
    let verifier = TokenVerifier::new(
        Arc::new(cache),
        policy().with_clock_skew(Duration::from_secs(120)),
    );
    let token = TestTokenBuilder::new().expires_in(-30).sign(&key).unwrap();

    assert!(verifier.verify(Some(&bearer(&token))).await.is_authenticated());
}

/// Expiry is inclusive: a token whose `exp` equals the current second is
/// still valid with zero clock skew.
#[tokio::test]
async fn test_token_expiring_this_second_is_accepted_without_skew() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    assert_eq!(policy().validation().leeway, 0);

    // Retry if the second rolls over between signing and checking.
    let mut checked = false;
    for _ in 0..5 {
        let second = chrono::Utc::now().timestamp();
        let token = TestTokenBuilder::new()
            .with_claim("exp", serde_json::json!(second))
            .sign(&key)
            .unwrap();

        let decision = verifier.verify(Some(&bearer(&token))).await;

        if chrono::Utc::now().timestamp() == second {
            assert!(decision.is_authenticated(), "got {decision:?}");
            checked = true;
            break;
        }
    }
    assert!(checked);
}

#[tokio::test]
async fn test_token_expired_one_second_ago_is_rejected_without_skew() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = TestTokenBuilder::new()
        .with_claim("exp", serde_json::json!(chrono::Utc::now().timestamp() - 1))
        .sign(&key)
        .unwrap();

    assert_eq!(
        verifier.verify(Some(&bearer(&token))).await,
        AuthDecision::Rejected(RejectionReason::Expired)
    );
}

// ============================================================================
// Header rejections
// ============================================================================

#[tokio::test]
async fn test_missing_header_is_rejected() {
    let verifier = verifier_trusting(&[&TestKeyPair::primary()]);

    assert_eq!(
        verifier.verify(None).await,
        AuthDecision::Rejected(RejectionReason::MissingHeader)
    );
    assert_eq!(
        verifier.verify(Some("")).await,
        AuthDecision::Rejected(RejectionReason::MissingHeader)
    );
}

#[tokio::test]
async fn test_header_without_credential_is_malformed() {
    let verifier = verifier_trusting(&[&TestKeyPair::primary()]);

    for header in ["Bearer", "Bearer   ", "just-a-token"] {
        assert_eq!(
            verifier.verify(Some(header)).await,
            AuthDecision::Rejected(RejectionReason::MalformedHeader),
            "{header:?}"
        );
    }
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = TestTokenBuilder::new().sign(&key).unwrap();

    for scheme in ["Basic", "Token", "JWT", "Bearer:"] {
        assert_eq!(
            verifier.verify(Some(&format!("{scheme} {token}"))).await,
            AuthDecision::Rejected(RejectionReason::UnsupportedScheme),
            "{scheme:?}"
        );
    }
}

// ============================================================================
// Signature rejections
// ============================================================================

#[tokio::test]
async fn test_token_signed_by_unknown_key_is_rejected() {
    let verifier = verifier_trusting(&[&TestKeyPair::primary()]);
    let token = TestTokenBuilder::new()
        .sign(&TestKeyPair::secondary())
        .unwrap();

    assert_eq!(
        verifier.verify(Some(&bearer(&token))).await,
        AuthDecision::Rejected(RejectionReason::InvalidSignature)
    );
}

#[tokio::test]
async fn test_known_kid_with_foreign_signature_is_rejected() {
    let verifier = verifier_trusting(&[&TestKeyPair::primary()]);
    // Secondary key material claiming to be the primary key.
    let impostor = TestKeyPair::secondary().with_kid(PRIMARY_KID);
    let token = TestTokenBuilder::new().sign(&impostor).unwrap();

    assert_eq!(
        verifier.verify(Some(&bearer(&token))).await,
        AuthDecision::Rejected(RejectionReason::InvalidSignature)
    );
}

#[tokio::test]
async fn test_token_without_kid_is_rejected() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = key
        .sign_with_header(&Header::new(Algorithm::RS256), &TestTokenBuilder::new().build())
        .unwrap();

    assert_eq!(
        verifier.verify(Some(&bearer(&token))).await,
        AuthDecision::Rejected(RejectionReason::InvalidSignature)
    );
}

#[tokio::test]
async fn test_hs256_token_is_rejected() {
    let verifier = verifier_trusting(&[&TestKeyPair::primary()]);
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(PRIMARY_KID.to_string());
    let token = encode(
        &header,
        &TestTokenBuilder::new().build(),
        &EncodingKey::from_secret(b"shared-secret"),
    )
    .unwrap();

    assert_eq!(
        verifier.verify(Some(&bearer(&token))).await,
        AuthDecision::Rejected(RejectionReason::InvalidSignature)
    );
}

#[tokio::test]
async fn test_alg_none_token_is_rejected() {
    let verifier = verifier_trusting(&[&TestKeyPair::primary()]);
    let header = URL_SAFE_NO_PAD.encode(format!(r#"{{"alg":"none","kid":"{PRIMARY_KID}"}}"#));
    let payload = URL_SAFE_NO_PAD.encode(TestTokenBuilder::new().build().to_string());
    let token = format!("{header}.{payload}.");

    assert_eq!(
        verifier.verify(Some(&bearer(&token))).await,
        AuthDecision::Rejected(RejectionReason::InvalidSignature)
    );
}

#[tokio::test]
async fn test_tampered_payload_is_rejected() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = TestTokenBuilder::new().sign(&key).unwrap();
    let forged_payload = URL_SAFE_NO_PAD.encode(
        TestTokenBuilder::new()
            .for_user("admin")
            .build()
            .to_string(),
    );

    let parts: Vec<&str> = token.split('.').collect();
    let forged = format!(
        "{}.{}.{}",
        parts.first().unwrap(),
        forged_payload,
        parts.last().unwrap()
    );

    assert_eq!(
        verifier.verify(Some(&bearer(&forged))).await,
        AuthDecision::Rejected(RejectionReason::InvalidSignature)
    );
}

#[tokio::test]
async fn test_garbage_credential_is_rejected() {
    let verifier = verifier_trusting(&[&TestKeyPair::primary()]);
    let oversized = "x".repeat(9000);

    for credential in ["not-a-jwt", "a.b.c", "a.b", oversized.as_str()] {
        assert_eq!(
            verifier.verify(Some(&bearer(credential))).await,
            AuthDecision::Rejected(RejectionReason::InvalidSignature),
            "credential of length {}",
            credential.len()
        );
    }
}

// ============================================================================
// Claim rejections
// ============================================================================

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);

    for token in [
        TestTokenBuilder::new().for_audience("account").sign(&key),
        TestTokenBuilder::new()
            .for_audiences(&["account", "broker"])
            .sign(&key),
        TestTokenBuilder::new().without_claim("aud").sign(&key),
    ] {
        assert_eq!(
            verifier.verify(Some(&bearer(&token.unwrap()))).await,
            AuthDecision::Rejected(RejectionReason::ClaimMismatch)
        );
    }
}

#[tokio::test]
async fn test_wrong_issuer_is_rejected() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);

    for issuer in [
        "https://idp/realms/other",
        "https://evil/realms/demo",
        "https://idp/realms/demo/",
    ] {
        let token = TestTokenBuilder::new().issued_by(issuer).sign(&key).unwrap();
        assert_eq!(
            verifier.verify(Some(&bearer(&token))).await,
            AuthDecision::Rejected(RejectionReason::ClaimMismatch),
            "{issuer:?}"
        );
    }
}

#[tokio::test]
async fn test_missing_or_empty_subject_is_rejected() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);

    for token in [
        TestTokenBuilder::new().without_claim("sub").sign(&key),
        TestTokenBuilder::new().for_user("").sign(&key),
    ] {
        assert_eq!(
            verifier.verify(Some(&bearer(&token.unwrap()))).await,
            AuthDecision::Rejected(RejectionReason::ClaimMismatch)
        );
    }
}

#[tokio::test]
async fn test_not_yet_valid_token_is_rejected() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = TestTokenBuilder::new()
        .not_before_in(3600)
        .sign(&key)
        .unwrap();

    assert_eq!(
        verifier.verify(Some(&bearer(&token))).await,
        AuthDecision::Rejected(RejectionReason::ClaimMismatch)
    );
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = TestTokenBuilder::new().expires_in(-3600).sign(&key).unwrap();

    assert_eq!(
        verifier.verify(Some(&bearer(&token))).await,
        AuthDecision::Rejected(RejectionReason::Expired)
    );
}

#[tokio::test]
async fn test_missing_expiry_is_rejected() {
    let key = TestKeyPair::primary();
    let verifier = verifier_trusting(&[&key]);
    let token = TestTokenBuilder::new()
        .without_claim("exp")
        .sign(&key)
        .unwrap();

    assert_eq!(
        verifier.verify(Some(&bearer(&token))).await,
        AuthDecision::Rejected(RejectionReason::ClaimMismatch)
    );
}

// ============================================================================
// Key source availability
// ============================================================================

#[tokio::test]
async fn test_unreachable_key_source_rejects_every_concurrent_call_then_recovers() {
    // Arrange
    let key = TestKeyPair::primary();
    let source = Arc::new(
        ScriptedKeySource::failing_once(
            KeySetError::Transport("connection refused".to_string()),
            key.key_set().unwrap(),
        )
        .with_delay(Duration::from_millis(50)),
    );
    let cache = Arc::new(KeySetCache::new(source.clone(), Duration::from_secs(2)));
    let verifier = TokenVerifier::new(cache, policy());
    let header = bearer(&TestTokenBuilder::new().sign(&key).unwrap());

    // Act
    let decisions = join_all((0..8).map(|_| verifier.verify(Some(&header)))).await;

    // Assert
    assert!(decisions
        .iter()
        .all(|d| *d == AuthDecision::Rejected(RejectionReason::KeySourceUnavailable)));
    assert_eq!(source.calls(), 1);
    assert!(!verifier.key_sets().is_cached());

    // Endpoint recovered
    assert!(verifier.verify(Some(&header)).await.is_authenticated());
    assert_eq!(source.calls(), 2);
    assert!(verifier.key_sets().is_cached());
}

#[tokio::test]
async fn test_header_rejections_do_not_touch_key_source() {
    let source = Arc::new(ScriptedKeySource::failing(KeySetError::Status(503)));
    let cache = Arc::new(KeySetCache::new(source.clone(), Duration::from_secs(1)));
    let verifier = TokenVerifier::new(cache, policy());

    assert_eq!(
        verifier.verify(None).await,
        AuthDecision::Rejected(RejectionReason::MissingHeader)
    );
    assert_eq!(
        verifier.verify(Some("Basic dXNlcjpwYXNz")).await,
        AuthDecision::Rejected(RejectionReason::UnsupportedScheme)
    );
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_unknown_kid_does_not_refetch_key_set() {
    let primary = TestKeyPair::primary();
    let source = Arc::new(ScriptedKeySource::succeeding(primary.key_set().unwrap()));
    let cache = Arc::new(KeySetCache::new(source.clone(), Duration::from_secs(1)));
    let verifier = TokenVerifier::new(cache, policy());

    let valid = TestTokenBuilder::new().sign(&primary).unwrap();
    let rotated = TestTokenBuilder::new()
        .sign(&TestKeyPair::secondary())
        .unwrap();

    assert!(verifier.verify(Some(&bearer(&valid))).await.is_authenticated());
    assert_eq!(
        verifier.verify(Some(&bearer(&rotated))).await,
        AuthDecision::Rejected(RejectionReason::InvalidSignature)
    );
    assert_eq!(source.calls(), 1);
}

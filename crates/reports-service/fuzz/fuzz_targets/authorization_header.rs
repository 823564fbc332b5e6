#![no_main]

use common::jwt::extract_kid;
use libfuzzer_sys::fuzz_target;
use reports_service::auth::jwks::JwksDocument;
use reports_service::auth::verifier::{parse_authorization, verify_credential};
use reports_service::auth::{SigningKeySet, ValidationPolicy};
use std::sync::OnceLock;

// Public half of the test suite's primary key.
const JWKS: &str = r#"{"keys":[{"kid":"test-key-primary","kty":"RSA","alg":"RS256","use":"sig","n":"rY1K229OGE7IsMQz8FO_kUkUVA-kkvb7R-C6aQHOESqR4xNjtgg0SI8Q-na4o26bwIYBkaDv0YB4Jv7s87yWpKvAQhcndJJgnQZC9nixCXSoeHu1ZUyQzWcwvvNx-9Bc3gkQ46nSIecxXhmKuKLiAnC2FBMsm33qfXWlz2-h8BqGTZT1rbD2oDw6eofroiuKthhMukxMKrlFSTCq3ZB3MkuM9wUnEAjO2DMOpemAofNYYP-biFkc85FLe3jb_RWczU5l6AYXekHQmiHmBOw6gA1ffg9JVrP97sagrq9F7RMnXEG-Vv3Qktw-ZPsAHQYk0t9vFrfBF-IKAoRM9gZ_5w","e":"AQAB"}]}"#;

fn key_set() -> Option<&'static SigningKeySet> {
    static KEY_SET: OnceLock<Option<SigningKeySet>> = OnceLock::new();
    KEY_SET
        .get_or_init(|| {
            let document: JwksDocument = serde_json::from_str(JWKS).ok()?;
            SigningKeySet::from_document(&document).ok()
        })
        .as_ref()
}

fuzz_target!(|data: &[u8]| {
    // Header values reach the verifier only as valid UTF-8
    let Ok(header) = std::str::from_utf8(data) else {
        return;
    };

    // Must never panic, whatever the header looks like
    let Ok(credential) = parse_authorization(Some(header)) else {
        return;
    };

    let _ = extract_kid(credential);

    if let Some(key_set) = key_set() {
        let validation = ValidationPolicy::new("reports-client", "https://idp/realms/demo")
            .validation();
        let _ = verify_credential(credential, key_set, &validation);
    }
});

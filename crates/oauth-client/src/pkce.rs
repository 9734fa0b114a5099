//! PKCE (Proof Key for Code Exchange) and state generation per RFC 7636
//!
//! The verifier stays in the user's session and is sent during token
//! exchange; the challenge goes out in the authorization URL so the
//! authorization server can check that the exchange came from the party that
//! started the flow.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};
use url::Url;

use crate::config::ClientConfig;

/// Only S256 is ever sent; `plain` is not supported.
pub const CHALLENGE_METHOD: &str = "S256";

/// A verifier and the challenge derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

/// Generate an unguessable, URL-safe state token.
///
/// 32 random bytes encoded as URL-safe base64 (no padding), 43 characters.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a cryptographically random PKCE code verifier.
///
/// 64 random bytes encoded as URL-safe base64 (no padding) gives 86
/// characters, inside the 43-128 range RFC 7636 allows.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 64];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
///
/// `challenge = BASE64URL(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Build a verifier/challenge pair.
///
/// An override verifier is used as-is, which makes the flow reproducible in
/// tests. Otherwise a fresh verifier is generated.
pub fn generate_pkce(verifier_override: Option<&str>) -> PkcePair {
    let verifier = match verifier_override {
        Some(v) => v.to_owned(),
        None => generate_verifier(),
    };
    let challenge = compute_challenge(&verifier);
    PkcePair {
        verifier,
        challenge,
    }
}

/// Whether `verifier` is a legal RFC 7636 §4.1 code verifier.
pub fn is_valid_verifier(verifier: &str) -> bool {
    (43..=128).contains(&verifier.len())
        && verifier
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~'))
}

/// Build the authorization redirect target.
///
/// Parameters are form-encoded in a fixed order and appended to the
/// configured authorization endpoint.
pub fn build_authorization_url(
    config: &ClientConfig,
    scope: &str,
    state: &str,
    challenge: &str,
) -> Url {
    let mut location = config.authorize_url.clone();
    location
        .query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", config.redirect_uri.as_str())
        .append_pair("scope", scope)
        .append_pair("state", state)
        .append_pair("code_challenge", challenge)
        .append_pair("code_challenge_method", CHALLENGE_METHOD);
    location
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_VERIFIER: &str = "br852dc1gwvRyMqfJth86GNYDMvQ5il9EA65Rg1lmoPJXgWDia3sPOtKOwl4qQXFO8gbgA5UA~2rB0LLeBYW28PqDT~ChgtNVmu_hsRuGVvZSdiyMqdCXzuxupoqA9AT";

    #[test]
    fn verifier_is_url_safe_base64() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), 86);
        assert!(
            verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "verifier must be URL-safe base64 (no padding): {verifier}"
        );
        assert!(is_valid_verifier(&verifier));
    }

    #[test]
    fn verifiers_and_states_are_unique() {
        assert_ne!(generate_verifier(), generate_verifier());
        assert_ne!(generate_state(), generate_state());
    }

    #[test]
    fn state_is_url_safe() {
        let state = generate_state();
        assert_eq!(state.len(), 43);
        assert!(
            state
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn challenge_is_deterministic() {
        let c1 = compute_challenge("test-verifier-value");
        let c2 = compute_challenge("test-verifier-value");
        assert_eq!(c1, c2, "same verifier must produce same challenge");
    }

    #[test]
    fn challenge_matches_known_value() {
        // SHA256("hello") = 2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824
        assert_eq!(
            compute_challenge("hello"),
            "LPJNul-wow4m6DsqxbninhsWHlwfp0JecwQzYpOLmCQ"
        );
    }

    #[test]
    fn override_verifier_is_used_as_is() {
        let pair = generate_pkce(Some(SEED_VERIFIER));
        assert_eq!(pair.verifier, SEED_VERIFIER);
        assert_eq!(pair.challenge, "1I50RLhjYVfXkX96X43JxEnK8HH_uxJnBZUFGq5kOh4");
    }

    #[test]
    fn generated_pair_is_bound() {
        let pair = generate_pkce(None);
        assert_eq!(pair.challenge, compute_challenge(&pair.verifier));

        let decoded = URL_SAFE_NO_PAD.decode(&pair.challenge).expect("valid base64url");
        assert_eq!(decoded.len(), 32, "SHA-256 hash must be 32 bytes");
    }

    #[test]
    fn verifier_validation_enforces_length_and_charset() {
        assert!(is_valid_verifier(SEED_VERIFIER));
        assert!(is_valid_verifier(&"a".repeat(43)));
        assert!(!is_valid_verifier(&"a".repeat(42)));
        assert!(!is_valid_verifier(&"a".repeat(129)));
        assert!(!is_valid_verifier(&format!("{}+", "a".repeat(50))));
    }

    #[test]
    fn authorization_url_contains_params_in_order() {
        let config = crate::config::tests::test_config();
        let url = build_authorization_url(&config, "sso", "12345", "abc");
        assert_eq!(
            url.as_str(),
            "https://dev.api.com/authorize?response_type=code&client_id=12345\
             &redirect_uri=https%3A%2F%2Fmy.app.com%2Fcallback&scope=sso&state=12345\
             &code_challenge=abc&code_challenge_method=S256"
        );
    }

    #[test]
    fn authorization_url_form_encodes_scope() {
        let config = crate::config::tests::test_config();
        let url = build_authorization_url(&config, "openid profile", "s", "c");
        assert!(url.as_str().contains("scope=openid+profile"), "got {url}");
    }
}

//! Shopify webhook signature verification.
//!
//! Shopify signs the raw request body with HMAC-SHA256 keyed by the app's
//! shared secret and sends the base64 digest in `X-Shopify-Hmac-Sha256`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify an inbound webhook body against its signature header.
///
/// Fails closed: a missing or empty shared secret, a missing header, or a
/// digest mismatch all return false. Comparison is constant-time.
#[must_use]
pub fn verify_signature(
    secret: Option<&SecretString>,
    raw_body: &[u8],
    signature_header: Option<&str>,
) -> bool {
    let Some(secret) = secret else {
        return false;
    };
    let secret = secret.expose_secret();
    if secret.is_empty() {
        return false;
    }

    let Some(provided) = signature_header else {
        return false;
    };
    if provided.is_empty() {
        return false;
    }

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(raw_body);

    let computed = BASE64.encode(mac.finalize().into_bytes());

    constant_time_compare(&computed, provided)
}

/// Compare two strings without early exit on the first differing byte.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key");
        mac.update(body);
        BASE64.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_valid_signature_accepted() {
        let secret = SecretString::from("webhook-shared-key-1");
        let body = br#"{"id": 1, "email": "a@x.com"}"#;
        let header = sign("webhook-shared-key-1", body);

        assert!(verify_signature(Some(&secret), body, Some(&header)));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let secret = SecretString::from("webhook-shared-key-1");
        let header = sign("webhook-shared-key-1", br#"{"id": 1}"#);

        assert!(!verify_signature(
            Some(&secret),
            br#"{"id": 2}"#,
            Some(&header)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let secret = SecretString::from("webhook-shared-key-1");
        let body = br#"{"id": 1}"#;
        let header = sign("some-other-key", body);

        assert!(!verify_signature(Some(&secret), body, Some(&header)));
    }

    #[test]
    fn test_missing_header_rejected() {
        let secret = SecretString::from("webhook-shared-key-1");
        assert!(!verify_signature(Some(&secret), b"{}", None));
        assert!(!verify_signature(Some(&secret), b"{}", Some("")));
    }

    #[test]
    fn test_missing_secret_rejected() {
        let body = b"{}";
        let header = sign("anything", body);
        assert!(!verify_signature(None, body, Some(&header)));

        let empty = SecretString::from("");
        assert!(!verify_signature(Some(&empty), body, Some(&header)));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}

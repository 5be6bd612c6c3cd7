//! Integration tests for Kartvizit.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and run migrations
//! cargo run -p kartvizit-cli -- migrate
//!
//! # Start the server
//! cargo run -p kartvizit-server
//!
//! # Run the ignored integration tests
//! cargo test -p kartvizit-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `KARTVIZIT_TEST_BASE_URL` - Server base URL (default `http://localhost:3000`)
//! - `KARTVIZIT_TEST_WEBHOOK_SECRET` - Shared secret matching the stored
//!   Shopify settings, used to sign webhook test payloads

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Base URL for the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("KARTVIZIT_TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Shared secret used to sign webhook payloads.
#[must_use]
pub fn webhook_secret() -> String {
    std::env::var("KARTVIZIT_TEST_WEBHOOK_SECRET").unwrap_or_else(|_| "test-secret".to_string())
}

/// Sign a payload the way Shopify does: base64 HMAC-SHA256 of the raw body.
#[must_use]
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

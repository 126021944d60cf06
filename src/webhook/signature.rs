//! HMAC-SHA256 verification of GitHub webhook deliveries.
//!
//! GitHub signs the raw request body with the shared secret and sends the
//! result in `x-hub-signature-256` as `sha256=<hex>`. Comparison must be
//! constant-time to keep the signature check from leaking prefix matches.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Scheme prefix of the signature header value.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Shared secret configured on the webhook.
#[derive(Debug, Clone)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Wraps a shared secret.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Computes the `sha256=<hex>` signature for a payload, for outbound
/// deliveries and tests.
#[must_use]
pub fn sign(secret: &WebhookSecret, body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length; this branch is unreachable for
        // byte-slice keys.
        Err(_) => return String::new(),
    };
    mac.update(body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a signature header value against the raw body.
///
/// Returns false for a missing header, an unexpected scheme, undecodable
/// hex, or a digest mismatch.
#[must_use]
pub fn verify(secret: &WebhookSecret, header_value: Option<&str>, body: &[u8]) -> bool {
    let Some(value) = header_value else {
        return false;
    };
    let Some(signature_hex) = value.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(claimed) = hex::decode(signature_hex) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(body);
    let expected = mac.finalize().into_bytes();
    constant_time_eq(&claimed, &expected)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0_u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

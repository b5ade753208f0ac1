//! Constant-time secret and webhook signature checks.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compares two secrets without short-circuiting on the first differing byte.
///
/// Strings of different lengths are unequal.
#[must_use]
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Verifies a Shopify `X-Shopify-Hmac-Sha256` header: the base64 encoding of
/// HMAC-SHA256 over the raw request body keyed with the webhook secret.
#[must_use]
pub fn verify_shopify_hmac(secret: &str, body: &[u8], header_value: &str) -> bool {
    let Ok(provided) = STANDARD.decode(header_value.trim()) else {
        return false;
    };
    let expected = shopify_hmac(secret, body);
    expected.as_slice().ct_eq(provided.as_slice()).into()
}

fn shopify_hmac(secret: &str, body: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return Vec::new();
    };
    mac.update(body);
    mac.finalize().into_bytes().to_vec()
}

/// Base64 HMAC-SHA256 of `body`, as Shopify would send it.
#[cfg(test)]
pub fn sign_shopify_body(secret: &str, body: &[u8]) -> String {
    STANDARD.encode(shopify_hmac(secret, body))
}

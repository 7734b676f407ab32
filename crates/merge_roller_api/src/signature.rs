//! Webhook signature verification
//!
//! GitHub signs every delivery with the webhook secret and sends the result in the
//! `X-Hub-Signature-256` header as `sha256=<hex HMAC-SHA256 of the raw body>`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;

/// Header carrying the delivery signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Returns `true` when `signature_header` matches the HMAC-SHA256 of `body` using `secret`.
///
/// The comparison runs in constant time.
pub fn verify_signature(body: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let Some(hex_part) = signature_header.strip_prefix("sha256=") else {
        return false;
    };

    let Ok(received_bytes) = hex::decode(hex_part) else {
        return false;
    };

    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);

    mac.verify_slice(&received_bytes).is_ok()
}

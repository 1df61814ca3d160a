//! HMAC-SHA256 payment and webhook signature verification.
//!
//! Client confirmations are signed over `order_id|payment_id` with the
//! gateway key secret. Webhook deliveries are signed over the raw request
//! body with the webhook secret. Both signatures are hex-encoded.
//!
//! A mismatch is an expected outcome, so verification returns `bool` and
//! never errors.

use crate::PaygateError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Build the message a client payment signature covers.
pub fn payment_signing_payload(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}

/// Compute a hex-encoded HMAC-SHA256 of `message`.
pub fn sign_hmac_sha256(secret: &str, message: &[u8]) -> Result<String, PaygateError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaygateError::ConfigError(format!("Invalid HMAC key: {}", e)))?;
    mac.update(message);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex-encoded HMAC-SHA256 in constant time.
///
/// Malformed hex or a wrong-length tag is a mismatch.
pub fn verify_hmac_sha256(secret: &str, message: &[u8], provided_hex: &str) -> bool {
    let Ok(provided) = hex::decode(provided_hex.trim()) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(message);

    // verify_slice compares in constant time
    mac.verify_slice(&provided).is_ok()
}

/// Verify a client-side payment confirmation signature.
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature: &str,
    key_secret: &str,
) -> bool {
    let payload = payment_signing_payload(order_id, payment_id);
    verify_hmac_sha256(key_secret, payload.as_bytes(), signature)
}

/// Verify a gateway webhook signature over the raw request body.
pub fn verify_webhook_signature(raw_payload: &[u8], signature: &str, webhook_secret: &str) -> bool {
    verify_hmac_sha256(webhook_secret, raw_payload, signature)
}

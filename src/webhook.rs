//! Webhook signature verification
//!
//! The service signs webhook deliveries with HMAC-SHA256 over the raw
//! request body and sends the hex digest in a signature header.
//! Verification runs against the exact bytes received: re-serializing
//! the JSON first would break the signature, since serializers do not
//! produce canonical output across languages.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Environment variable consulted when no secret is passed explicitly
pub const WEBHOOK_SECRET_ENV: &str = "ADRENAL_WEBHOOK_SECRET";

#[derive(Debug, Clone, thiserror::Error)]
pub enum WebhookError {
    #[error("No webhook secret provided and {WEBHOOK_SECRET_ENV} is not set")]
    MissingSecret,
}

/// Check a webhook delivery against its signature header.
///
/// `signature` is the lowercase or uppercase hex digest from the
/// delivery; malformed hex verifies as `false` rather than erroring,
/// since a garbled header is an authentication failure, not a
/// configuration problem. Only a missing secret is an error.
pub fn verify_webhook(
    payload: &[u8],
    signature: &str,
    secret: Option<&str>,
) -> Result<bool, WebhookError> {
    let secret = match secret {
        Some(s) => s.to_string(),
        None => std::env::var(WEBHOOK_SECRET_ENV).map_err(|_| WebhookError::MissingSecret)?,
    };
    Ok(verify_with_secret(payload, signature, &secret))
}

/// Produce the hex signature for a payload, as the service does when
/// delivering. Useful for tests and local webhook emulation.
pub fn sign_webhook(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

fn verify_with_secret(payload: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    // Constant-time comparison, resistant to timing probes.
    mac.verify_slice(&expected).is_ok()
}

//! Webhook signature verification.
//!
//! The gateway signs `timestamp + "." + raw_body` with HMAC-SHA256 and sends
//! the hex digest in a header. Verification recomputes the digest and
//! compares in constant time; requests whose timestamp strays outside the
//! replay window are rejected before any body processing.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::webhook::error::WebhookError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Header carrying the unix timestamp the signature covers.
pub const TIMESTAMP_HEADER: &str = "X-Webhook-Timestamp";

/// Computes the hex signature for a payload at a given timestamp.
///
/// # Panics
///
/// Panics if the secret is empty enough to be rejected by HMAC
/// initialization, which accepts keys of any length in practice.
#[must_use]
pub fn sign(secret: &str, timestamp: i64, raw_body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{timestamp}.{raw_body}").as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a webhook request signature and timestamp.
///
/// The timestamp is checked first: a request older or newer than
/// `tolerance_secs` is rejected without computing the digest. The signature
/// comparison is constant-time.
///
/// # Errors
///
/// - `MalformedTimestamp` if the header is not a unix timestamp
/// - `TimestampOutOfRange` if the request is outside the replay window
/// - `InvalidSignature` if the digest does not match
pub fn verify_signature(
    secret: &str,
    timestamp_header: &str,
    raw_body: &str,
    provided_hex: &str,
    now: DateTime<Utc>,
    tolerance_secs: i64,
) -> Result<(), WebhookError> {
    let timestamp: i64 = timestamp_header
        .trim()
        .parse()
        .map_err(|_| WebhookError::MalformedTimestamp)?;

    if (now.timestamp() - timestamp).abs() > tolerance_secs {
        return Err(WebhookError::TimestampOutOfRange);
    }

    let provided = hex::decode(provided_hex.trim()).map_err(|_| WebhookError::InvalidSignature)?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| WebhookError::InvalidSignature)?;
    mac.update(format!("{timestamp}.{raw_body}").as_bytes());

    // verify_slice is a constant-time comparison.
    mac.verify_slice(&provided)
        .map_err(|_| WebhookError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &str = r#"{"notes":"Provider:0192d7c8-0000-7000-8000-000000000000"}"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_valid_signature_passes() {
        let ts = now().timestamp();
        let sig = sign(SECRET, ts, BODY);
        let result = verify_signature(SECRET, &ts.to_string(), BODY, &sig, now(), 300);
        assert!(result.is_ok());
    }

    #[test]
    fn test_tampered_body_fails() {
        let ts = now().timestamp();
        let sig = sign(SECRET, ts, BODY);
        let tampered = BODY.replace("0192d7c8", "ffffffff");
        let result = verify_signature(SECRET, &ts.to_string(), &tampered, &sig, now(), 300);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let ts = now().timestamp();
        let sig = sign("other_secret", ts, BODY);
        let result = verify_signature(SECRET, &ts.to_string(), BODY, &sig, now(), 300);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn test_non_hex_signature_fails() {
        let ts = now().timestamp();
        let result = verify_signature(SECRET, &ts.to_string(), BODY, "not-hex!", now(), 300);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let ts = now().timestamp() - 301;
        let sig = sign(SECRET, ts, BODY);
        let result = verify_signature(SECRET, &ts.to_string(), BODY, &sig, now(), 300);
        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[test]
    fn test_future_timestamp_fails() {
        let ts = now().timestamp() + 301;
        let sig = sign(SECRET, ts, BODY);
        let result = verify_signature(SECRET, &ts.to_string(), BODY, &sig, now(), 300);
        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[test]
    fn test_edge_of_window_passes() {
        let ts = now().timestamp() - 300;
        let sig = sign(SECRET, ts, BODY);
        let result = verify_signature(SECRET, &ts.to_string(), BODY, &sig, now(), 300);
        assert!(result.is_ok());
    }

    #[test]
    fn test_garbage_timestamp_fails() {
        let result = verify_signature(SECRET, "yesterday", BODY, "aa", now(), 300);
        assert!(matches!(result, Err(WebhookError::MalformedTimestamp)));
    }
}

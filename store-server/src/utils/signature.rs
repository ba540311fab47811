//! Webhook signature verification
//!
//! Gateway and carrier callbacks are signed with HMAC-SHA256 over the raw
//! request body using a per-provider shared secret. The raw bytes are
//! verified before any payload field is trusted; verification failure means
//! the event is discarded, never applied.
//!
//! The exact signing scheme is provider-specific; this module implements
//! the shared-secret HMAC contract and nothing more.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify a hex-encoded HMAC-SHA256 signature over the raw payload
///
/// Comparison happens inside `verify_slice`, which is constant-time.
pub fn verify(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Sign a payload, producing the hex signature a provider would send
///
/// Used by tests and by provider simulators.
pub fn sign(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_signature_is_accepted() {
        let payload = br#"{"event_id":"evt-1"}"#;
        let sig = sign("whsec_test", payload);
        assert!(verify("whsec_test", payload, &sig));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let payload = br#"{"event_id":"evt-1"}"#;
        let sig = sign("other_secret", payload);
        assert!(!verify("whsec_test", payload, &sig));
    }

    #[test]
    fn modified_payload_is_rejected() {
        let payload = br#"{"event_id":"evt-1"}"#;
        let sig = sign("whsec_test", payload);
        assert!(!verify("whsec_test", br#"{"event_id":"evt-2"}"#, &sig));
    }

    #[test]
    fn garbage_signature_is_rejected() {
        assert!(!verify("whsec_test", b"payload", "not-hex"));
        assert!(!verify("whsec_test", b"payload", ""));
    }
}

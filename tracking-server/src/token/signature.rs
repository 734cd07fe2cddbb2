//! Token signature computation and verification.
//!
//! Tracking links carry the encoded token and its signature as two path
//! segments. The signature is an HMAC-SHA256 over the encoded segment,
//! hex-encoded, keyed with the server-held signing secret. A token is
//! trusted only after this check passes.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex signature for an encoded token segment.
///
/// The outbound send pipeline runs the same computation when embedding
/// tracking links in email HTML.
pub fn sign(signing_key: &str, data: &str) -> String {
    // HMAC-SHA256 accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(signing_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify the signature carried alongside an encoded token segment.
///
/// Returns `false` on any mismatch or missing input; never panics on
/// untrusted data.
pub fn verify(signing_key: &str, data: &str, signature: &str) -> bool {
    if data.is_empty() || signature.is_empty() {
        warn!(
            has_data = !data.is_empty(),
            has_signature = !signature.is_empty(),
            "token_signature_missing_fields"
        );
        return false;
    }

    let expected = sign(signing_key, data);

    // Constant-time comparison to prevent timing attacks
    let valid = constant_time_compare(&expected, signature);

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "token_signature_mismatch"
        );
    }

    valid
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_round_trip() {
        let sig = sign("test-signing-key", "c29tZS10b2tlbg");
        assert!(verify("test-signing-key", "c29tZS10b2tlbg", &sig));
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let sig = sign("key-one", "c29tZS10b2tlbg");
        assert!(!verify("key-two", "c29tZS10b2tlbg", &sig));
    }

    #[test]
    fn test_verify_rejects_altered_data() {
        let sig = sign("test-signing-key", "c29tZS10b2tlbg");
        assert!(!verify("test-signing-key", "c29tZS10b2tlbG", &sig));
    }

    #[test]
    fn test_verify_rejects_altered_signature() {
        let mut sig = sign("test-signing-key", "c29tZS10b2tlbg");
        let last = sig.pop().unwrap();
        sig.push(if last == '0' { '1' } else { '0' });
        assert!(!verify("test-signing-key", "c29tZS10b2tlbg", &sig));
    }

    #[test]
    fn test_verify_rejects_empty_inputs() {
        assert!(!verify("key", "", "deadbeef"));
        assert!(!verify("key", "c29tZS10b2tlbg", ""));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}

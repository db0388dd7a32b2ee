//! HMAC-SHA-256 signature verification over raw webhook payloads.
//!
//! Verification always runs against the exact bytes the sender signed,
//! never a re-serialized parse, so semantically-equivalent-but-byte-different
//! JSON cannot bypass it. Digest comparison is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Outcome of verifying one inbound payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// No secret configured: verification is disabled and everything passes.
    /// Logged as a warning every time it is exercised.
    Disabled,
    Valid,
    Invalid,
}

impl Verification {
    pub fn is_authentic(self) -> bool {
        !matches!(self, Verification::Invalid)
    }
}

/// Hex-encoded HMAC-SHA-256 digest of `payload` under `secret`.
pub fn compute_digest(secret: &str, payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify `supplied` against the digest of `payload` under `secret`.
///
/// A missing supplied signature fails verification when a secret is
/// configured — distinct from verification being disabled.
pub fn verify(secret: Option<&str>, payload: &[u8], supplied: Option<&str>) -> Verification {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        warn!("signature verification disabled (no signing secret configured)");
        return Verification::Disabled;
    };

    let Some(supplied) = supplied else {
        return Verification::Invalid;
    };

    let expected = compute_digest(secret, payload);
    if expected.as_bytes().ct_eq(supplied.as_bytes()).into() {
        Verification::Valid
    } else {
        Verification::Invalid
    }
}

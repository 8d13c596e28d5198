//! Cryptographic primitives used by the verifier and token codec
//!
//! ## Security Patterns
//!
//! - **Constant-Time Comparison**: Prevents timing attacks on hash comparisons
//! - **HMAC-SHA256**: Token signatures, verified without early exit
//! - **CSPRNG**: Salts and signing keys come from the OS-seeded thread RNG

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA256 tag in bytes
pub const SIGNATURE_LEN: usize = 32;

/// Performs constant-time comparison of two byte slices.
///
/// Standard `==` on slices returns at the first mismatching byte, which lets
/// an attacker who can time responses recover a secret one byte at a time.
/// The `subtle` comparison touches every byte regardless of where (or if)
/// the inputs differ. Slices of different length compare unequal.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Compute an HMAC-SHA256 tag over `message`.
pub fn sign(key: &[u8], message: &[u8]) -> [u8; SIGNATURE_LEN] {
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    };
    mac.update(message);
    mac.finalize().into_bytes().into()
}

/// Verify an HMAC-SHA256 tag in constant time.
///
/// Tags of the wrong length are rejected.
pub fn verify_signature(key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(signature).is_ok()
}

/// Fill a fresh buffer with `len` bytes from the thread CSPRNG.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

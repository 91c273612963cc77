//! `WebAuthn` cryptography helpers
//!
//! Hashing, constant-time comparison and random challenge generation. Signature
//! verification lives with the key type in [`super::cose`].

use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use subtle::ConstantTimeEq;

use super::base64url;

/// Hash data using SHA-256
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(digest::digest(&digest::SHA256, data).as_ref());
    out
}

/// Compare two byte strings without short-circuiting on the first difference
///
/// Slices of different length compare unequal.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Generate `length` bytes of challenge material from the OS CSPRNG
///
/// # Errors
///
/// Returns an error if the system random source fails.
pub fn generate_challenge(length: usize) -> Result<Vec<u8>, ring::error::Unspecified> {
    let mut bytes = vec![0u8; length];
    SystemRandom::new().fill(&mut bytes)?;
    Ok(bytes)
}

/// Generate a base64url user handle from 16 random bytes
///
/// # Errors
///
/// Returns an error if the system random source fails.
pub fn generate_user_handle() -> Result<String, ring::error::Unspecified> {
    let mut bytes = [0u8; 16];
    SystemRandom::new().fill(&mut bytes)?;
    Ok(base64url::encode(&bytes))
}

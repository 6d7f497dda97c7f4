//! Password key derivation.
//!
//! A password maps to a fixed-length envelope key by hashing its UTF-8
//! bytes with SHA-256 and hex-encoding the digest. No salt is mixed in,
//! so identical passwords derive identical keys across installations —
//! a known weakness of the stored format. A production-grade deployment
//! should mix a per-record random salt into the derivation and persist
//! it alongside the envelope.

use sha2::{Digest, Sha256};

use crate::error::VaultError;

/// Derive the fixed-length envelope key for `password`.
///
/// Deterministic: the same password always yields the same key. Returns
/// the lowercase hex encoding of a 32-byte digest.
#[must_use]
pub fn derive_key(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    hex::encode(digest)
}

/// Confirm that the platform can supply secure entropy.
///
/// Key generation and mnemonic entropy both depend on the OS random
/// source; the facade calls this once at construction so a missing
/// primitive surfaces immediately rather than mid-operation.
///
/// # Errors
///
/// Returns [`VaultError::UnsupportedEnvironment`] when the OS entropy
/// source is unavailable.
pub fn probe_environment() -> Result<(), VaultError> {
    let mut probe = [0u8; 1];
    getrandom::getrandom(&mut probe).map_err(|e| {
        VaultError::unsupported_environment(format!("no secure entropy source: {e}"))
    })
}

/// Fill `buf` with secure random bytes.
///
/// # Errors
///
/// Returns [`VaultError::UnsupportedEnvironment`] when the OS entropy
/// source is unavailable.
pub fn random_bytes(buf: &mut [u8]) -> Result<(), VaultError> {
    getrandom::getrandom(buf)
        .map_err(|e| VaultError::unsupported_environment(format!("entropy request failed: {e}")))
}

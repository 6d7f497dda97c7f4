//! Account key generation.
//!
//! Thin wrapper over [`alloy`]'s local signer: fresh keypairs from OS
//! entropy, and re-derivation from BIP39 seed material on import.

use std::fmt;

use alloy::primitives::hex;
use alloy::signers::local::PrivateKeySigner;
use zeroize::Zeroizing;

use super::kdf;
use crate::error::VaultError;

/// A secp256k1 keypair in wire form.
pub struct Keypair {
    /// EIP-55 checksummed address.
    pub address: String,
    /// `0x`-prefixed private key hex.
    pub private_key: String,
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Generate a fresh random keypair.
///
/// # Errors
///
/// Returns [`VaultError::UnsupportedEnvironment`] when OS entropy is
/// unavailable.
pub fn generate() -> Result<Keypair, VaultError> {
    // A 32-byte sample lands outside the curve order with probability
    // ~2^-128; resample rather than bias.
    loop {
        let mut secret = Zeroizing::new([0u8; 32]);
        kdf::random_bytes(secret.as_mut())?;
        if let Ok(signer) = PrivateKeySigner::from_slice(secret.as_ref()) {
            return Ok(from_signer(&signer));
        }
    }
}

/// Re-derive a keypair from BIP39 seed material.
///
/// Takes the first 32 bytes of the seed as the private key scalar.
///
/// # Errors
///
/// Returns [`VaultError::InvalidMnemonic`] when the seed is too short or
/// does not yield a valid key.
pub fn from_seed(seed: &[u8]) -> Result<Keypair, VaultError> {
    let scalar = seed.get(..32).ok_or(VaultError::InvalidMnemonic)?;
    let signer = PrivateKeySigner::from_slice(scalar).map_err(|_| VaultError::InvalidMnemonic)?;
    Ok(from_signer(&signer))
}

fn from_signer(signer: &PrivateKeySigner) -> Keypair {
    Keypair {
        address: signer.address().to_checksum(None),
        private_key: format!("0x{}", hex::encode(signer.to_bytes())),
    }
}

//! Recovery-phrase provider boundary.
//!
//! Mnemonic handling is consumed through [`MnemonicProvider`] so the
//! vault never depends on a concrete wordlist implementation;
//! [`Bip39Provider`] is the bundled default over the English BIP39
//! wordlist.

use std::fmt;

use bip39::{Language, Mnemonic};

use crate::error::VaultError;

/// Opaque recovery-phrase primitive: generate, validate, derive seed.
pub trait MnemonicProvider: Send + Sync + fmt::Debug {
    /// Build a phrase from raw entropy (16 bytes → 12 words).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidMnemonic`] for unsupported entropy
    /// lengths.
    fn generate(&self, entropy: &[u8]) -> Result<String, VaultError>;

    /// Whether `phrase` passes checksum validation.
    fn validate(&self, phrase: &str) -> bool;

    /// Derive the 64-byte seed for `phrase` (empty passphrase).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidMnemonic`] when the phrase fails
    /// validation.
    fn to_seed(&self, phrase: &str) -> Result<Vec<u8>, VaultError>;
}

/// Default provider over the English BIP39 wordlist.
#[derive(Debug, Default, Clone, Copy)]
pub struct Bip39Provider;

impl MnemonicProvider for Bip39Provider {
    fn generate(&self, entropy: &[u8]) -> Result<String, VaultError> {
        Mnemonic::from_entropy_in(Language::English, entropy)
            .map(|m| m.to_string())
            .map_err(|_| VaultError::InvalidMnemonic)
    }

    fn validate(&self, phrase: &str) -> bool {
        Mnemonic::parse_in_normalized(Language::English, phrase).is_ok()
    }

    fn to_seed(&self, phrase: &str) -> Result<Vec<u8>, VaultError> {
        let mnemonic = Mnemonic::parse_in_normalized(Language::English, phrase)
            .map_err(|_| VaultError::InvalidMnemonic)?;
        Ok(mnemonic.to_seed("").to_vec())
    }
}

//! Sealed storage envelopes.
//!
//! An envelope wraps a serializable payload together with the
//! fingerprint of the key derived from the sealing password and a
//! creation timestamp, then encodes the whole as base64 JSON. Opening
//! re-derives the key from the supplied password and rejects the blob
//! unless the fingerprint matches exactly.
//!
//! The payload is encoded, not encrypted: confidentiality rests on the
//! fingerprint check plus the access control of the backing store, and
//! cryptographic strength comes from the key derivation alone. This is a
//! documented weakness of the stored format, not a feature.
//!
//! Sealing and opening are pure transformations; callers own all
//! storage I/O, which lets the wallet vault and the session manager
//! share one envelope discipline across different storage tiers and key
//! sources.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::kdf;
use crate::error::VaultError;

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    data: T,
    key: String,
    timestamp: i64,
}

/// Seal `payload` under `password` into an opaque envelope string.
///
/// # Errors
///
/// Returns [`VaultError::InvalidFormat`] if the payload cannot be
/// serialized.
pub fn seal<T: Serialize>(payload: &T, password: &str) -> Result<String, VaultError> {
    let envelope = Envelope {
        data: payload,
        key: kdf::derive_key(password),
        timestamp: Utc::now().timestamp_millis(),
    };
    let json = serde_json::to_vec(&envelope).map_err(|_| VaultError::InvalidFormat)?;
    Ok(BASE64.encode(json))
}

/// Open an envelope string with `password` and deserialize its payload.
///
/// # Errors
///
/// - [`VaultError::InvalidFormat`] when the blob is not base64 JSON
///   carrying the required fields.
/// - [`VaultError::WrongPassword`] when the stored key fingerprint does
///   not match the one derived from `password`.
pub fn open<T: DeserializeOwned>(blob: &str, password: &str) -> Result<T, VaultError> {
    if blob.is_empty() {
        return Err(VaultError::InvalidFormat);
    }
    let raw = BASE64.decode(blob).map_err(|_| VaultError::InvalidFormat)?;
    let envelope: Envelope<T> =
        serde_json::from_slice(&raw).map_err(|_| VaultError::InvalidFormat)?;
    if envelope.key.is_empty() || envelope.timestamp <= 0 {
        return Err(VaultError::InvalidFormat);
    }
    if envelope.key != kdf::derive_key(password) {
        return Err(VaultError::WrongPassword);
    }
    Ok(envelope.data)
}

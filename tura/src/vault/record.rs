//! Persisted record types.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A locally created or imported wallet.
///
/// One record per wallet, sealed under its owning password and persisted
/// in the durable tier keyed by lowercased address. Exists in cleartext
/// only between an [`envelope::open`](super::envelope::open) call and
/// drop; the secret fields zeroize on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct WalletRecord {
    /// EIP-55 checksummed account address.
    #[zeroize(skip)]
    pub address: String,
    /// `0x`-prefixed private key hex. Never persisted outside an envelope.
    pub private_key: String,
    /// BIP39 recovery phrase, when one exists for this wallet.
    pub mnemonic: Option<String>,
    /// RFC 3339 creation time.
    #[zeroize(skip)]
    pub created_at: String,
}

impl fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRecord")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// The single unlocked-session record.
///
/// At most one exists per process, sealed into the session tier;
/// creating a new one silently replaces any prior one. The cached
/// password zeroizes on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct SessionRecord {
    /// The unlock credential, cached for the session's duration.
    pub password: String,
    /// Expiry instant, epoch milliseconds.
    #[zeroize(skip)]
    pub expires_at: i64,
}

impl fmt::Debug for SessionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("password", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Non-secret response to create / import / login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSummary {
    /// EIP-55 checksummed account address.
    pub address: String,
    /// RFC 3339 creation time of the underlying record.
    pub created_at: String,
    /// Recovery phrase — present only on the call that created the
    /// wallet, shown once and not retrievable by any other operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn sample_record() -> WalletRecord {
        WalletRecord {
            address: "0xAbC0000000000000000000000000000000000001".into(),
            private_key: "0x4c0883a69102937d6231471b5dbb6204fe512961708279f1d8b1b8b0e1b7f2aa".into(),
            mnemonic: Some("legal winner thank year wave sausage worth useful legal winner thank yellow".into()),
            created_at: "2025-06-01T12:00:00+00:00".into(),
        }
    }

    #[test]
    fn wallet_debug_redacts_secrets() {
        let rendered = format!("{:?}", sample_record());
        assert!(rendered.contains("0xAbC0"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("4c0883a"));
        assert!(!rendered.contains("legal winner"));
    }

    #[test]
    fn session_debug_redacts_password() {
        let record = SessionRecord {
            password: "password123".into(),
            expires_at: 1_700_000_000_000,
        };
        let rendered = format!("{record:?}");
        assert!(!rendered.contains("password123"));
        assert!(rendered.contains("1700000000000"));
    }

    #[test]
    fn wallet_record_serde_round_trip() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: WalletRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.address, record.address);
        assert_eq!(back.private_key, record.private_key);
        assert_eq!(back.mnemonic, record.mnemonic);
    }

    #[test]
    fn summary_omits_absent_mnemonic() {
        let summary = WalletSummary {
            address: "0xabc".into(),
            created_at: "2025-06-01T12:00:00+00:00".into(),
            mnemonic: None,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("mnemonic"));
    }
}

//! Durable wallet collection.
//!
//! One sealed record per locally created or imported wallet, keyed by
//! lowercased address in the durable tier. Wallet creation supports an
//! optional two-phase flow — generate-and-preview, then
//! confirm-and-persist — so a caller can require the user to back up the
//! recovery phrase before anything touches storage.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use zeroize::Zeroizing;

use super::envelope;
use super::kdf;
use super::keys;
use super::mnemonic::MnemonicProvider;
use super::record::{WalletRecord, WalletSummary};
use super::storage::{KeyValueStore, WALLET_KEY_PREFIX};
use crate::error::VaultError;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

const MNEMONIC_ENTROPY_BYTES: usize = 16;

/// Owner of the encrypted wallet records.
pub struct WalletVault {
    store: Arc<dyn KeyValueStore>,
    mnemonics: Arc<dyn MnemonicProvider>,
    pending: Mutex<Option<PendingWallet>>,
}

// Generated but not yet persisted; dropped (and zeroized) on abort.
struct PendingWallet {
    record: WalletRecord,
    password: Zeroizing<String>,
}

impl fmt::Debug for WalletVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletVault")
            .field("mnemonics", &self.mnemonics)
            .finish_non_exhaustive()
    }
}

impl WalletVault {
    /// Creates a vault over the durable tier.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, mnemonics: Arc<dyn MnemonicProvider>) -> Self {
        Self {
            store,
            mnemonics,
            pending: Mutex::new(None),
        }
    }

    /// Generate a wallet and persist it in one step.
    ///
    /// The returned summary carries the recovery phrase — the only time
    /// any operation hands it out.
    ///
    /// # Errors
    ///
    /// [`VaultError::WeakPassword`] for passwords under
    /// [`MIN_PASSWORD_LEN`]; storage and entropy failures propagate.
    pub async fn create_wallet(&self, password: &str) -> Result<WalletSummary, VaultError> {
        let preview = self.begin_create(password).await?;
        self.commit_create().await?;
        Ok(preview)
    }

    /// First half of two-phase creation: generate a keypair and phrase,
    /// hold them as pending, persist nothing.
    ///
    /// A second call replaces the previous pending wallet.
    ///
    /// # Errors
    ///
    /// [`VaultError::WeakPassword`] for passwords under
    /// [`MIN_PASSWORD_LEN`]; entropy failures propagate.
    pub async fn begin_create(&self, password: &str) -> Result<WalletSummary, VaultError> {
        Self::check_password(password)?;
        let keypair = keys::generate()?;
        let mut entropy = Zeroizing::new([0u8; MNEMONIC_ENTROPY_BYTES]);
        kdf::random_bytes(entropy.as_mut())?;
        let phrase = self.mnemonics.generate(entropy.as_ref())?;

        let record = WalletRecord {
            address: keypair.address,
            private_key: keypair.private_key,
            mnemonic: Some(phrase),
            created_at: Utc::now().to_rfc3339(),
        };
        let summary = WalletSummary {
            address: record.address.clone(),
            created_at: record.created_at.clone(),
            mnemonic: record.mnemonic.clone(),
        };
        *self.pending.lock().await = Some(PendingWallet {
            record,
            password: Zeroizing::new(password.to_owned()),
        });
        Ok(summary)
    }

    /// Second half of two-phase creation: seal and persist the pending
    /// wallet. The returned summary no longer carries the phrase.
    ///
    /// # Errors
    ///
    /// [`VaultError::NoPendingWallet`] when nothing is pending; storage
    /// failures propagate.
    pub async fn commit_create(&self) -> Result<WalletSummary, VaultError> {
        let pending = self
            .pending
            .lock()
            .await
            .take()
            .ok_or(VaultError::NoPendingWallet)?;
        self.persist(&pending.record, &pending.password).await?;
        info!(address = %pending.record.address, "wallet created");
        Ok(WalletSummary {
            address: pending.record.address.clone(),
            created_at: pending.record.created_at.clone(),
            mnemonic: None,
        })
    }

    /// Discard any pending wallet creation.
    pub async fn abort_create(&self) {
        self.pending.lock().await.take();
    }

    /// Import a wallet from its recovery phrase.
    ///
    /// # Errors
    ///
    /// [`VaultError::InvalidMnemonic`] on checksum failure,
    /// [`VaultError::WeakPassword`] for short passwords; storage
    /// failures propagate.
    pub async fn import_wallet(
        &self,
        phrase: &str,
        password: &str,
    ) -> Result<WalletSummary, VaultError> {
        Self::check_password(password)?;
        if !self.mnemonics.validate(phrase) {
            return Err(VaultError::InvalidMnemonic);
        }
        let seed = Zeroizing::new(self.mnemonics.to_seed(phrase)?);
        let keypair = keys::from_seed(&seed)?;

        let record = WalletRecord {
            address: keypair.address,
            private_key: keypair.private_key,
            mnemonic: Some(phrase.to_owned()),
            created_at: Utc::now().to_rfc3339(),
        };
        self.persist(&record, password).await?;
        info!(address = %record.address, "wallet imported");
        Ok(WalletSummary {
            address: record.address.clone(),
            created_at: record.created_at.clone(),
            mnemonic: None,
        })
    }

    /// Unlock a stored wallet, returning its non-secret summary.
    ///
    /// # Errors
    ///
    /// [`VaultError::WalletNotFound`] when no record exists for
    /// `address`, [`VaultError::WrongPassword`] when decryption fails.
    pub async fn login(&self, address: &str, password: &str) -> Result<WalletSummary, VaultError> {
        let record = self.get_wallet_data(address, password).await?;
        info!(address = %record.address, "wallet unlocked");
        Ok(WalletSummary {
            address: record.address.clone(),
            created_at: record.created_at.clone(),
            mnemonic: None,
        })
    }

    /// Decrypt and return the full record, secret included.
    ///
    /// For internal reuse by signing paths; callers must drop the record
    /// as soon as the secret has been used.
    ///
    /// # Errors
    ///
    /// [`VaultError::WalletNotFound`] when no record exists for
    /// `address`, [`VaultError::WrongPassword`] when decryption fails.
    pub async fn get_wallet_data(
        &self,
        address: &str,
        password: &str,
    ) -> Result<WalletRecord, VaultError> {
        let blob = self
            .store
            .get(&Self::storage_key(address))
            .await?
            .ok_or(VaultError::WalletNotFound)?;
        envelope::open(&blob, password)
    }

    /// Enumerate stored wallet addresses without decrypting anything.
    ///
    /// Addresses come back in the storage-normalized (lowercased) form.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn list_stored_wallets(&self) -> Result<Vec<String>, VaultError> {
        Ok(self
            .store
            .keys()
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(WALLET_KEY_PREFIX).map(str::to_owned))
            .collect())
    }

    fn storage_key(address: &str) -> String {
        format!("{WALLET_KEY_PREFIX}{}", address.to_lowercase())
    }

    fn check_password(password: &str) -> Result<(), VaultError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(VaultError::WeakPassword);
        }
        Ok(())
    }

    async fn persist(&self, record: &WalletRecord, password: &str) -> Result<(), VaultError> {
        let blob = envelope::seal(record, password)?;
        self.store
            .set(&Self::storage_key(&record.address), &blob)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::vault::mnemonic::Bip39Provider;
    use crate::vault::storage::MemoryStore;

    fn vault() -> WalletVault {
        WalletVault::new(Arc::new(MemoryStore::new()), Arc::new(Bip39Provider))
    }

    mod create {
        use super::*;

        #[tokio::test]
        async fn weak_password_rejected() {
            let vault = vault();
            let err = vault.create_wallet("short").await.unwrap_err();
            assert!(matches!(err, VaultError::WeakPassword));
            assert!(vault.list_stored_wallets().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn eight_characters_accepted() {
            let vault = vault();
            assert!(vault.create_wallet("longenough1").await.is_ok());
        }

        #[tokio::test]
        async fn returns_address_and_phrase_once() {
            let vault = vault();
            let summary = vault.create_wallet("password123").await.unwrap();

            assert!(summary.address.starts_with("0x"));
            let phrase = summary.mnemonic.unwrap();
            assert_eq!(phrase.split_whitespace().count(), 12);

            // No later operation returns the phrase in its summary.
            let login = vault
                .login(&summary.address, "password123")
                .await
                .unwrap();
            assert!(login.mnemonic.is_none());
        }

        #[tokio::test]
        async fn secret_round_trips_through_storage() {
            let vault = vault();
            let summary = vault.create_wallet("password123").await.unwrap();

            let record = vault
                .get_wallet_data(&summary.address, "password123")
                .await
                .unwrap();
            assert_eq!(record.address, summary.address);
            assert!(record.private_key.starts_with("0x"));
            assert_eq!(record.private_key.len(), 66);
        }

        #[tokio::test]
        async fn sequential_creates_are_independent() {
            let vault = vault();
            let first = vault.create_wallet("first-password").await.unwrap();
            let second = vault.create_wallet("second-password").await.unwrap();
            assert_ne!(first.address, second.address);

            // Each record opens only under its own password.
            assert!(
                vault
                    .get_wallet_data(&first.address, "first-password")
                    .await
                    .is_ok()
            );
            assert!(matches!(
                vault
                    .get_wallet_data(&first.address, "second-password")
                    .await
                    .unwrap_err(),
                VaultError::WrongPassword
            ));
            assert!(
                vault
                    .get_wallet_data(&second.address, "second-password")
                    .await
                    .is_ok()
            );
        }
    }

    mod two_phase {
        use super::*;

        #[tokio::test]
        async fn begin_persists_nothing() {
            let vault = vault();
            let preview = vault.begin_create("password123").await.unwrap();
            assert!(preview.mnemonic.is_some());
            assert!(vault.list_stored_wallets().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn commit_persists_the_previewed_wallet() {
            let vault = vault();
            let preview = vault.begin_create("password123").await.unwrap();
            let committed = vault.commit_create().await.unwrap();

            assert_eq!(committed.address, preview.address);
            assert!(committed.mnemonic.is_none());
            assert!(
                vault
                    .login(&preview.address, "password123")
                    .await
                    .is_ok()
            );
        }

        #[tokio::test]
        async fn abort_discards_pending() {
            let vault = vault();
            vault.begin_create("password123").await.unwrap();
            vault.abort_create().await;

            assert!(matches!(
                vault.commit_create().await.unwrap_err(),
                VaultError::NoPendingWallet
            ));
            assert!(vault.list_stored_wallets().await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn commit_without_begin_fails() {
            let vault = vault();
            assert!(matches!(
                vault.commit_create().await.unwrap_err(),
                VaultError::NoPendingWallet
            ));
        }

        #[tokio::test]
        async fn second_begin_replaces_pending() {
            let vault = vault();
            let first = vault.begin_create("password123").await.unwrap();
            let second = vault.begin_create("password123").await.unwrap();
            vault.commit_create().await.unwrap();

            let stored = vault.list_stored_wallets().await.unwrap();
            assert_eq!(stored, vec![second.address.to_lowercase()]);
            assert_ne!(first.address, second.address);
        }
    }

    mod import {
        use super::*;

        const PHRASE: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

        #[tokio::test]
        async fn valid_phrase_imports_deterministically() {
            let vault = vault();
            let first = vault.import_wallet(PHRASE, "password123").await.unwrap();
            assert!(first.mnemonic.is_none());

            let other = WalletVault::new(Arc::new(MemoryStore::new()), Arc::new(Bip39Provider));
            let second = other.import_wallet(PHRASE, "different-pw").await.unwrap();
            assert_eq!(first.address, second.address);
        }

        #[tokio::test]
        async fn imported_wallet_is_loginable() {
            let vault = vault();
            let summary = vault.import_wallet(PHRASE, "password123").await.unwrap();
            assert!(
                vault
                    .login(&summary.address, "password123")
                    .await
                    .is_ok()
            );
        }

        #[tokio::test]
        async fn bad_checksum_rejected() {
            let vault = vault();
            let err = vault
                .import_wallet("abandon abandon abandon", "password123")
                .await
                .unwrap_err();
            assert!(matches!(err, VaultError::InvalidMnemonic));
        }

        #[tokio::test]
        async fn weak_password_rejected() {
            let vault = vault();
            let err = vault.import_wallet(PHRASE, "short").await.unwrap_err();
            assert!(matches!(err, VaultError::WeakPassword));
        }
    }

    mod login {
        use super::*;

        #[tokio::test]
        async fn unknown_address_is_not_found() {
            let vault = vault();
            let err = vault
                .login("0x0000000000000000000000000000000000000001", "password123")
                .await
                .unwrap_err();
            assert!(matches!(err, VaultError::WalletNotFound));
        }

        #[tokio::test]
        async fn wrong_password_uniform_error() {
            let vault = vault();
            let summary = vault.create_wallet("password123").await.unwrap();
            let err = vault.login(&summary.address, "wrongpass").await.unwrap_err();
            assert!(matches!(err, VaultError::WrongPassword));
        }

        #[tokio::test]
        async fn address_lookup_is_case_insensitive() {
            let vault = vault();
            let summary = vault.create_wallet("password123").await.unwrap();
            assert!(
                vault
                    .login(&summary.address.to_uppercase().replace("0X", "0x"), "password123")
                    .await
                    .is_ok()
            );
        }
    }

    mod listing {
        use super::*;

        #[tokio::test]
        async fn lists_only_wallet_keys() {
            let store = Arc::new(MemoryStore::new());
            store.set("last_wallet_address", "0xabc").await.unwrap();
            store.set("agent_registry", "[]").await.unwrap();

            let vault = WalletVault::new(
                Arc::clone(&store) as Arc<dyn KeyValueStore>,
                Arc::new(Bip39Provider),
            );
            let summary = vault.create_wallet("password123").await.unwrap();

            let wallets = vault.list_stored_wallets().await.unwrap();
            assert_eq!(wallets, vec![summary.address.to_lowercase()]);
        }

        #[tokio::test]
        async fn empty_vault_lists_nothing() {
            assert!(vault().list_stored_wallets().await.unwrap().is_empty());
        }
    }
}

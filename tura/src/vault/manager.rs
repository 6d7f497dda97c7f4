//! Wallet operations facade.
//!
//! [`WalletManager`] composes the vault, the session manager, and the
//! address resolver into the surface the rest of the application calls,
//! and delegates balance reads and broadcasts to the opaque ledger
//! client. It is an explicitly constructed, injectable instance — the
//! application entry point owns its lifecycle — and "one active session"
//! holds through single-instance ownership rather than a global.
//!
//! Every successful create, login, logout, and transaction publishes a
//! consistent [`WalletInfo`] snapshot over a watch channel.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::kdf;
use super::mnemonic::Bip39Provider;
use super::record::{SessionRecord, WalletSummary};
use super::resolver::AddressResolver;
use super::session::SessionManager;
use super::state::WalletInfo;
use super::storage::{KeyValueStore, LAST_WALLET_KEY};
use super::vault::WalletVault;
use crate::error::{Result, VaultError};
use crate::ledger::{LedgerClient, TransactionReceipt};

/// Facade over vault, session, resolver, and ledger.
pub struct WalletManager {
    vault: Arc<WalletVault>,
    session: Arc<SessionManager>,
    resolver: AddressResolver,
    ledger: Arc<dyn LedgerClient>,
    durable_store: Arc<dyn KeyValueStore>,
    state: watch::Sender<WalletInfo>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletManager")
            .field("ledger", &self.ledger)
            .field("state", &self.state.borrow().clone())
            .finish_non_exhaustive()
    }
}

impl WalletManager {
    /// Creates a facade with the default vault and session wiring.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedEnvironment`] when the platform
    /// lacks secure entropy and [`VaultError::StorageUnavailable`] when
    /// the durable tier fails its startup probe.
    pub async fn new(
        durable_store: Arc<dyn KeyValueStore>,
        session_store: Arc<dyn KeyValueStore>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Result<Self> {
        let vault = Arc::new(WalletVault::new(
            Arc::clone(&durable_store),
            Arc::new(Bip39Provider),
        ));
        let session = Arc::new(SessionManager::new(
            session_store,
            Arc::clone(&durable_store),
        )?);
        Self::with_parts(vault, session, ledger, durable_store).await
    }

    /// Creates a facade from pre-built collaborators (custom clock,
    /// mnemonic provider, or stores).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedEnvironment`] when the platform
    /// lacks secure entropy and [`VaultError::StorageUnavailable`] when
    /// the durable tier fails its startup probe.
    pub async fn with_parts(
        vault: Arc<WalletVault>,
        session: Arc<SessionManager>,
        ledger: Arc<dyn LedgerClient>,
        durable_store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        kdf::probe_environment()?;
        // Surface an unusable durable tier at startup, not on the first
        // wallet operation.
        durable_store.keys().await?;

        let resolver = AddressResolver::new(
            Arc::clone(&vault),
            Arc::clone(&session),
            Arc::clone(&durable_store),
        );
        let (state, _) = watch::channel(WalletInfo::default());
        Ok(Self {
            vault,
            session,
            resolver,
            ledger,
            durable_store,
            state,
            monitor: Mutex::new(None),
        })
    }

    /// Create a wallet, unlock a session for it, and publish the new
    /// snapshot. The returned summary carries the recovery phrase,
    /// shown exactly once.
    ///
    /// # Errors
    ///
    /// Propagates vault errors ([`VaultError::WeakPassword`] and
    /// friends) and storage failures.
    pub async fn create_wallet(&self, password: &str) -> Result<WalletSummary> {
        let summary = self.vault.create_wallet(password).await?;
        self.session.begin(password).await?;
        self.remember_wallet(&summary.address).await?;
        self.publish_snapshot(Some(summary.address.clone())).await;
        Ok(summary)
    }

    /// Two-phase creation, first half: generate and preview without
    /// persisting, so the caller can demand a recovery-phrase backup
    /// first.
    ///
    /// # Errors
    ///
    /// Propagates vault errors.
    pub async fn begin_create(&self, password: &str) -> Result<WalletSummary> {
        Ok(self.vault.begin_create(password).await?)
    }

    /// Two-phase creation, second half: persist the previewed wallet.
    ///
    /// No session is started — the caller confirms the backup and then
    /// logs in explicitly.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::NoPendingWallet`] when nothing is pending.
    pub async fn confirm_create(&self) -> Result<WalletSummary> {
        let summary = self.vault.commit_create().await?;
        self.remember_wallet(&summary.address).await?;
        self.publish_snapshot(Some(summary.address.clone())).await;
        Ok(summary)
    }

    /// Discard a pending two-phase creation.
    pub async fn abort_create(&self) {
        self.vault.abort_create().await;
    }

    /// Import a wallet from its recovery phrase. No session side
    /// effects.
    ///
    /// # Errors
    ///
    /// Propagates vault errors ([`VaultError::InvalidMnemonic`] and
    /// friends).
    pub async fn import_wallet(&self, phrase: &str, password: &str) -> Result<WalletSummary> {
        Ok(self.vault.import_wallet(phrase, password).await?)
    }

    /// Unlock `address`, start a session, and publish the new snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::WalletNotFound`] or
    /// [`VaultError::WrongPassword`]; storage failures propagate.
    pub async fn login(&self, address: &str, password: &str) -> Result<WalletSummary> {
        let summary = self.vault.login(address, password).await?;
        self.session.begin(password).await?;
        self.remember_wallet(&summary.address).await?;
        self.publish_snapshot(Some(summary.address.clone())).await;
        Ok(summary)
    }

    /// End the session and publish a disconnected snapshot. Idempotent.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn logout(&self) -> Result<()> {
        self.session.end().await?;
        self.publish_snapshot(None).await;
        info!("logged out");
        Ok(())
    }

    /// Resolve the current wallet address, `None` without an active
    /// session or a wallet its password opens.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn current_address(&self) -> Result<Option<String>> {
        Ok(self.resolver.resolve().await?)
    }

    /// Return the active session record, refreshing its bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::SessionExpired`] when no valid session
    /// exists.
    pub async fn active_session(&self) -> Result<SessionRecord> {
        Ok(self
            .session
            .validate()
            .await?
            .ok_or(VaultError::SessionExpired)?)
    }

    /// Enumerate stored wallet addresses without decrypting anything.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn list_stored_wallets(&self) -> Result<Vec<String>> {
        Ok(self.vault.list_stored_wallets().await?)
    }

    /// Balance of `address` from the ledger, as a decimal string.
    ///
    /// # Errors
    ///
    /// Ledger failures propagate.
    pub async fn get_balance(&self, address: &str) -> Result<String> {
        Ok(self.ledger.get_balance(address).await?)
    }

    /// Decrypt the sender's key, delegate signing and broadcast to the
    /// ledger, and publish a refreshed snapshot. The decrypted secret
    /// never outlives the call.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::WrongPassword`] or
    /// [`VaultError::WalletNotFound`] from the decrypt step; ledger
    /// failures propagate.
    pub async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        password: &str,
    ) -> Result<TransactionReceipt> {
        let record = self.vault.get_wallet_data(from, password).await?;
        let receipt = self
            .ledger
            .send_signed_transaction(from, to, amount, &record.private_key)
            .await?;
        drop(record);

        info!(hash = %receipt.transaction_hash, "transaction broadcast");
        self.publish_snapshot(Some(from.to_lowercase())).await;
        Ok(receipt)
    }

    /// Subscribe to snapshot updates.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WalletInfo> {
        self.state.subscribe()
    }

    /// The most recently published snapshot.
    #[must_use]
    pub fn state(&self) -> WalletInfo {
        self.state.borrow().clone()
    }

    /// Poll ledger liveness into the snapshot's `is_connected` flag
    /// every `period`. Replaces any previous monitor; stopped by
    /// [`shutdown`](Self::shutdown) or drop.
    pub fn spawn_connectivity_monitor(self: &Arc<Self>, period: Duration) {
        let weak = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let Some(manager) = weak.upgrade() else { break };
                let listening = manager.ledger.is_listening().await.unwrap_or(false);
                let unlocked = matches!(manager.session.validate().await, Ok(Some(_)));
                manager
                    .state
                    .send_modify(|info| info.is_connected = listening && unlocked);
            }
        });
        if let Ok(mut slot) = self.monitor.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Stop the connectivity monitor, if one is running.
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.monitor.lock()
            && let Some(handle) = slot.take()
        {
            handle.abort();
        }
    }

    async fn remember_wallet(&self, address: &str) -> Result<()> {
        self.durable_store
            .set(LAST_WALLET_KEY, &address.to_lowercase())
            .await?;
        Ok(())
    }

    async fn publish_snapshot(&self, address: Option<String>) {
        let info = match address {
            Some(address) => {
                let balance = match self.ledger.get_balance(&address).await {
                    Ok(balance) => balance,
                    Err(e) => {
                        warn!(error = %e, "balance refresh failed");
                        "0".to_owned()
                    }
                };
                let unlocked = matches!(self.session.validate().await, Ok(Some(_)));
                let listening = self.ledger.is_listening().await.unwrap_or(false);
                WalletInfo {
                    address,
                    balance,
                    is_connected: unlocked && listening,
                }
            }
            None => WalletInfo::default(),
        };
        self.state.send_replace(info);
    }
}

impl Drop for WalletManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

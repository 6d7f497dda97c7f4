//! Current-address resolution.
//!
//! Given an active session, decide which stored wallet "the current
//! user" refers to: prefer the last-used hint, fall back to trial
//! decryption over every stored wallet. The fallback is O(n) in the
//! wallet count — acceptable only because local wallet counts are
//! small — and when several wallets share the session password the
//! first that decrypts wins, in unspecified order.

use std::sync::Arc;

use super::session::SessionManager;
use super::storage::{KeyValueStore, LAST_WALLET_KEY};
use super::vault::WalletVault;
use crate::error::VaultError;

/// Resolves the session to a stored wallet address.
#[derive(Debug)]
pub struct AddressResolver {
    vault: Arc<WalletVault>,
    session: Arc<SessionManager>,
    durable_store: Arc<dyn KeyValueStore>,
}

impl AddressResolver {
    /// Creates a resolver over the vault, session, and durable tier.
    #[must_use]
    pub fn new(
        vault: Arc<WalletVault>,
        session: Arc<SessionManager>,
        durable_store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            vault,
            session,
            durable_store,
        }
    }

    /// Resolve the current address, or `None` without an active session
    /// or a wallet the session password can open.
    ///
    /// A returned address is guaranteed decryptable with the session's
    /// cached password — resolution doubles as a credential check.
    /// Addresses come back storage-normalized (lowercased).
    ///
    /// # Errors
    ///
    /// Storage failures while enumerating wallets propagate.
    pub async fn resolve(&self) -> Result<Option<String>, VaultError> {
        let Some(session) = self.session.validate().await? else {
            return Ok(None);
        };

        if let Ok(Some(hint)) = self.durable_store.get(LAST_WALLET_KEY).await {
            if self
                .vault
                .get_wallet_data(&hint, &session.password)
                .await
                .is_ok()
            {
                return Ok(Some(hint.to_lowercase()));
            }
        }

        for address in self.vault.list_stored_wallets().await? {
            if self
                .vault
                .get_wallet_data(&address, &session.password)
                .await
                .is_ok()
            {
                return Ok(Some(address));
            }
        }
        Ok(None)
    }
}

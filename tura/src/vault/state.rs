//! Broadcastable wallet snapshot.

use serde::{Deserialize, Serialize};

/// Post-operation wallet snapshot for observers (UI state).
///
/// Published by the facade over a watch channel after every successful
/// create, login, logout, and transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletInfo {
    /// Current wallet address, empty when disconnected.
    pub address: String,
    /// Decimal balance string in whole-token units.
    pub balance: String,
    /// Whether an unlocked session exists and the ledger is reachable.
    pub is_connected: bool,
}

impl Default for WalletInfo {
    fn default() -> Self {
        Self {
            address: String::new(),
            balance: "0".to_owned(),
            is_connected: false,
        }
    }
}

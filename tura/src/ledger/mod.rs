//! Ledger client boundary.
//!
//! The vault core treats the chain as an opaque collaborator behind
//! [`LedgerClient`]: balances in, receipts out, no retry policy assumed.
//! [`VirtualLedger`] is the bundled locally-simulated chain the Tura
//! personas run against.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod r#virtual;

pub use r#virtual::{FAUCET_AMOUNT_TURA, VirtualLedger};

use crate::error::LedgerError;

/// Chain ID of the local Tura network.
pub const CHAIN_ID: u64 = 1337;
/// Human-readable chain name.
pub const CHAIN_NAME: &str = "Tura";
/// Native currency symbol.
pub const CURRENCY_SYMBOL: &str = "TURA";
/// Native currency decimals.
pub const CURRENCY_DECIMALS: u8 = 18;

/// Receipt returned by a successful (or failed-on-chain) broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    /// `0x`-prefixed transaction hash.
    pub transaction_hash: String,
    /// Block the transaction landed in.
    pub block_number: u64,
    /// `0x`-prefixed block hash.
    pub block_hash: String,
    /// Whether execution succeeded.
    pub status: bool,
    /// Sender address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Recipient address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Deployed contract address, for creation transactions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    /// Gas consumed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
}

/// Opaque chain boundary: balance reads, signed broadcast, liveness.
///
/// Failures are terminal for the call that produced them; callers must
/// not assume any retry policy from the implementation.
#[async_trait]
pub trait LedgerClient: Send + Sync + fmt::Debug {
    /// Native balance of `address` as a decimal string in whole-token
    /// units.
    async fn get_balance(&self, address: &str) -> Result<String, LedgerError>;

    /// Sign with `private_key` and broadcast a transfer of `amount`
    /// whole tokens from `from` to `to`.
    async fn send_signed_transaction(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        private_key: &str,
    ) -> Result<TransactionReceipt, LedgerError>;

    /// Whether the backing node is reachable.
    async fn is_listening(&self) -> Result<bool, LedgerError>;
}

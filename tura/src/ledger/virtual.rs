//! Locally simulated chain.
//!
//! [`VirtualLedger`] keeps per-address balances in memory and fabricates
//! receipts, standing in for a real node so the wallet and the agent
//! personas work fully offline. Beyond the [`LedgerClient`] surface it
//! exposes the local-network conveniences the personas rely on: a test
//! faucet and service-fee deduction.

use std::collections::HashMap;

use alloy::primitives::utils::{format_ether, parse_ether};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{LedgerClient, TransactionReceipt};
use crate::error::LedgerError;

/// Whole tokens handed out per faucet request.
pub const FAUCET_AMOUNT_TURA: &str = "100";

const TRANSFER_GAS: u64 = 21_000;

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<String, U256>,
    block_number: u64,
}

/// In-memory simulated ledger.
#[derive(Debug, Default)]
pub struct VirtualLedger {
    inner: RwLock<LedgerState>,
}

impl VirtualLedger {
    /// Creates an empty ledger: every address starts at balance zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `address` with the fixed faucet amount, returning the new
    /// balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAddress`] for malformed addresses.
    pub async fn distribute_faucet(&self, address: &str) -> Result<String, LedgerError> {
        let key = normalize_address(address)?;
        let amount = parse_amount(FAUCET_AMOUNT_TURA)?;
        let mut state = self.inner.write().await;
        let balance = state.balances.entry(key.clone()).or_default();
        *balance += amount;
        let updated = *balance;
        debug!(address = %key, balance = %format_tura(updated), "faucet distributed");
        Ok(format_tura(updated))
    }

    /// Deduct a service fee of `fee` whole tokens from `address`,
    /// returning the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] when the balance
    /// cannot cover the fee, [`LedgerError::InvalidAddress`] or
    /// [`LedgerError::InvalidAmount`] for malformed input.
    pub async fn deduct_fee(&self, address: &str, fee: &str) -> Result<String, LedgerError> {
        let key = normalize_address(address)?;
        let amount = parse_amount(fee)?;
        let mut state = self.inner.write().await;
        let balance = state.balances.entry(key.clone()).or_default();
        if *balance < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        *balance -= amount;
        let updated = *balance;
        debug!(address = %key, fee, "fee deducted");
        Ok(format_tura(updated))
    }
}

#[async_trait]
impl LedgerClient for VirtualLedger {
    async fn get_balance(&self, address: &str) -> Result<String, LedgerError> {
        let key = normalize_address(address)?;
        let state = self.inner.read().await;
        let balance = state.balances.get(&key).copied().unwrap_or_default();
        Ok(format_tura(balance))
    }

    async fn send_signed_transaction(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        private_key: &str,
    ) -> Result<TransactionReceipt, LedgerError> {
        let from_key = normalize_address(from)?;
        let to_key = normalize_address(to)?;
        check_private_key(private_key)?;
        let value = parse_amount(amount)?;
        if value.is_zero() {
            return Err(LedgerError::invalid_amount("amount must be greater than 0"));
        }

        let mut state = self.inner.write().await;
        let sender = state.balances.entry(from_key.clone()).or_default();
        if *sender < value {
            return Err(LedgerError::InsufficientBalance);
        }
        *sender -= value;
        *state.balances.entry(to_key.clone()).or_default() += value;
        state.block_number += 1;

        let receipt = TransactionReceipt {
            transaction_hash: random_hash()?,
            block_number: state.block_number,
            block_hash: random_hash()?,
            status: true,
            from: Some(from_key),
            to: Some(to_key),
            contract_address: None,
            gas_used: Some(TRANSFER_GAS),
        };
        debug!(hash = %receipt.transaction_hash, block = receipt.block_number, "transfer applied");
        Ok(receipt)
    }

    async fn is_listening(&self) -> Result<bool, LedgerError> {
        Ok(true)
    }
}

fn normalize_address(address: &str) -> Result<String, LedgerError> {
    address
        .parse::<Address>()
        .map(|_| address.to_lowercase())
        .map_err(|_| LedgerError::invalid_address(address))
}

fn check_private_key(private_key: &str) -> Result<(), LedgerError> {
    let hex_part = private_key
        .strip_prefix("0x")
        .ok_or(LedgerError::InvalidKey)?;
    if hex_part.len() != 64 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LedgerError::InvalidKey);
    }
    Ok(())
}

fn parse_amount(amount: &str) -> Result<U256, LedgerError> {
    parse_ether(amount).map_err(|e| LedgerError::invalid_amount(format!("{amount}: {e}")))
}

// Decimal string in whole tokens with insignificant zeros trimmed.
fn format_tura(wei: U256) -> String {
    let formatted = format_ether(wei);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}

fn random_hash() -> Result<String, LedgerError> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| LedgerError::provider(format!("entropy unavailable: {e}")))?;
    Ok(format!("0x{}", hex::encode(bytes)))
}

//! Unified error types for the tura crate.
//!
//! This module provides the error hierarchy covering:
//! - Vault errors (credential storage, envelopes, sessions)
//! - Ledger errors (balance queries, transaction submission)
//! - Agent errors (intent classification, registries)

/// Result type alias for tura operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the tura crate.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Credential vault or session error.
    #[error("Vault error: {0}")]
    Vault(#[from] VaultError),

    /// Ledger client error.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Agent layer error.
    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error type for credential vault and session operations.
///
/// Every password-related failure is normalized to one of these
/// categories before it leaves the vault boundary; messages carry no
/// secret material.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum VaultError {
    /// Password shorter than the required minimum.
    #[error("Password must be at least 8 characters long")]
    WeakPassword,

    /// Envelope fingerprint mismatch. The message is deliberately
    /// uniform so callers cannot tell a bad password from bad data.
    #[error("Invalid password or data")]
    WrongPassword,

    /// No envelope stored for the requested address.
    #[error("Wallet not found")]
    WalletNotFound,

    /// Recovery phrase failed checksum validation.
    #[error("Invalid mnemonic phrase")]
    InvalidMnemonic,

    /// Session missing, past its expiry, or past the inactivity ceiling.
    #[error("Session expired")]
    SessionExpired,

    /// Envelope blob could not be parsed or lacks required fields.
    #[error("Invalid envelope format")]
    InvalidFormat,

    /// Commit requested with no wallet creation in progress.
    #[error("No wallet creation in progress")]
    NoPendingWallet,

    /// The platform lacks a required primitive (secure entropy).
    /// Fatal for the whole vault; surfaced once at construction.
    #[error("Unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    /// A storage tier is inaccessible.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl VaultError {
    /// Create an unsupported-environment error.
    #[must_use]
    pub fn unsupported_environment(msg: impl Into<String>) -> Self {
        Self::UnsupportedEnvironment(msg.into())
    }

    /// Create a storage-unavailable error.
    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    /// Whether the caller can recover by retrying with different input
    /// (as opposed to a fatal environment or storage failure).
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::UnsupportedEnvironment(_) | Self::StorageUnavailable(_)
        )
    }
}

/// Error type for ledger client operations.
///
/// Failures are terminal for the call that produced them; the vault core
/// assumes no retry policy from the ledger.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum LedgerError {
    /// Malformed account address.
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Malformed private key material.
    #[error("Invalid private key format")]
    InvalidKey,

    /// Amount failed to parse or is not positive.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Sender balance cannot cover the transfer.
    #[error("Insufficient balance for transaction")]
    InsufficientBalance,

    /// Node or provider failure.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Transaction submission failure.
    #[error("Transaction error: {0}")]
    Transaction(String),
}

impl LedgerError {
    /// Create an invalid-address error.
    #[must_use]
    pub fn invalid_address(addr: impl Into<String>) -> Self {
        Self::InvalidAddress(addr.into())
    }

    /// Create an invalid-amount error.
    #[must_use]
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    /// Create a provider error.
    #[must_use]
    pub fn provider(msg: impl Into<String>) -> Self {
        Self::Provider(msg.into())
    }

    /// Create a transaction error.
    #[must_use]
    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }
}

/// Error type for the agent persona layer.
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum AgentError {
    /// Intent classifier failure.
    #[error("Classifier error: {0}")]
    Classifier(String),

    /// Contract address failed validation.
    #[error("Invalid contract address")]
    InvalidContractAddress,

    /// An agent with the same contract address is already registered.
    #[error("An agent with this contract address already exists")]
    DuplicateAgent,

    /// Registry storage failure.
    #[error("Registry error: {0}")]
    Registry(String),
}

impl AgentError {
    /// Create a classifier error.
    #[must_use]
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a registry error.
    #[must_use]
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }
}

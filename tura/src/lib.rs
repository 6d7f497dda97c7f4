//! Tura - an agent-driven chat wallet over a local credential vault.
//!
//! This crate provides the core of the Tura chat wallet: an encrypted
//! local vault for wallet credentials, a time-bounded unlock session,
//! and the agent personas that drive wallet operations from natural
//! language.
//!
//! # Architecture
//!
//! ```text
//! agent::Persona (WalletAgent, DeployAgent, AutoWorkflow)
//!   → vault::WalletManager (facade: create / login / balance / send)
//!     → vault::{WalletVault, SessionManager, AddressResolver}
//!       → vault::envelope + vault::kdf over two storage tiers
//!   → ledger::LedgerClient (opaque chain boundary; VirtualLedger locally)
//! ```

pub mod agent;
pub mod error;
pub mod ledger;
pub mod stores;
pub mod vault;

pub use error::{AgentError, Error, LedgerError, Result, VaultError};

//! Credential vault and session lifecycle.
//!
//! This module owns everything that touches wallet secrets at rest:
//! password key derivation, sealed storage envelopes, the durable wallet
//! collection, the single unlocked session, and the facade the rest of
//! the application calls.
//!
//! # Architecture
//!
//! ```text
//! WalletManager (facade)
//!   ├── WalletVault      — encrypted wallet records, durable tier
//!   ├── SessionManager   — unlock session, tab-scoped tier
//!   └── AddressResolver  — "current address" over both
//!         └── envelope::seal / envelope::open
//!               └── kdf::derive_key
//! ```
//!
//! Secrets exist in cleartext only inside an active decrypt call; both
//! [`WalletRecord`] and [`SessionRecord`] zeroize on drop.

pub mod envelope;
pub mod kdf;
pub mod keys;
mod manager;
pub mod mnemonic;
mod record;
mod resolver;
mod session;
mod state;
pub mod storage;
#[allow(clippy::module_inception)]
mod vault;

pub use manager::WalletManager;
pub use mnemonic::{Bip39Provider, MnemonicProvider};
pub use record::{SessionRecord, WalletRecord, WalletSummary};
pub use resolver::AddressResolver;
pub use session::{
    Clock, INACTIVITY_CEILING_MS, ManualClock, RENEWAL_THRESHOLD_MS, SessionManager, SystemClock,
    UNLOCK_WINDOW_MS,
};
pub use state::WalletInfo;
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use vault::{MIN_PASSWORD_LEN, WalletVault};

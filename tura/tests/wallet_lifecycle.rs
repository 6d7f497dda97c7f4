//! End-to-end vault and facade scenarios.

use std::sync::Arc;

use tura::ledger::{LedgerClient, VirtualLedger};
use tura::vault::{
    Bip39Provider, Clock, KeyValueStore, ManualClock, MemoryStore, SessionManager, SqliteStore,
    UNLOCK_WINDOW_MS, WalletManager, WalletVault,
};
use tura::{Error, VaultError};

fn memory() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

async fn facade() -> (Arc<VirtualLedger>, WalletManager) {
    let ledger = Arc::new(VirtualLedger::new());
    let manager = WalletManager::new(
        memory(),
        memory(),
        Arc::clone(&ledger) as Arc<dyn LedgerClient>,
    )
    .await
    .expect("facade construction");
    (ledger, manager)
}

#[tokio::test]
async fn create_login_and_read_secret_back() {
    let vault = WalletVault::new(memory(), Arc::new(Bip39Provider));

    let created = vault.create_wallet("password123").await.unwrap();
    assert!(created.mnemonic.is_some());

    vault.login(&created.address, "password123").await.unwrap();
    assert!(matches!(
        vault.login(&created.address, "wrongpass").await.unwrap_err(),
        VaultError::WrongPassword
    ));

    // The stored secret comes back unchanged, read after read.
    let first = vault
        .get_wallet_data(&created.address, "password123")
        .await
        .unwrap();
    let second = vault
        .get_wallet_data(&created.address, "password123")
        .await
        .unwrap();
    assert_eq!(first.private_key, second.private_key);
    assert_eq!(first.mnemonic, created.mnemonic);
    assert_eq!(first.created_at, created.created_at);
}

#[tokio::test]
async fn two_wallets_are_isolated_by_password() {
    let vault = WalletVault::new(memory(), Arc::new(Bip39Provider));

    let first = vault.create_wallet("first-password").await.unwrap();
    let second = vault.create_wallet("second-password").await.unwrap();
    assert_ne!(first.address, second.address);

    assert!(
        vault
            .get_wallet_data(&first.address, "second-password")
            .await
            .is_err()
    );
    assert!(
        vault
            .get_wallet_data(&second.address, "first-password")
            .await
            .is_err()
    );

    let wallets = vault.list_stored_wallets().await.unwrap();
    assert_eq!(wallets.len(), 2);
}

#[tokio::test]
async fn import_recovers_the_same_account_anywhere() {
    const PHRASE: &str = "legal winner thank year wave sausage worth useful legal winner thank yellow";

    let here = WalletVault::new(memory(), Arc::new(Bip39Provider));
    let there = WalletVault::new(memory(), Arc::new(Bip39Provider));

    let a = here.import_wallet(PHRASE, "password123").await.unwrap();
    let b = there.import_wallet(PHRASE, "other-password").await.unwrap();
    assert_eq!(a.address, b.address);

    assert!(matches!(
        here.import_wallet("definitely not a phrase", "password123")
            .await
            .unwrap_err(),
        VaultError::InvalidMnemonic
    ));
}

#[tokio::test]
async fn facade_transfer_moves_funds_and_reports() {
    let (ledger, manager) = facade().await;
    let sender = manager.create_wallet("password123").await.unwrap();
    ledger.distribute_faucet(&sender.address).await.unwrap();

    let recipient = "0x00000000000000000000000000000000000000b2";
    let receipt = manager
        .send_transaction(&sender.address, recipient, "12.5", "password123")
        .await
        .unwrap();
    assert!(receipt.status);
    assert!(receipt.transaction_hash.starts_with("0x"));

    assert_eq!(manager.get_balance(&sender.address).await.unwrap(), "87.5");
    assert_eq!(manager.get_balance(recipient).await.unwrap(), "12.5");

    let info = manager.state();
    assert_eq!(info.balance, "87.5");
    assert!(info.is_connected);
}

#[tokio::test]
async fn transfer_with_wrong_password_is_rejected_before_the_ledger() {
    let (ledger, manager) = facade().await;
    let sender = manager.create_wallet("password123").await.unwrap();
    ledger.distribute_faucet(&sender.address).await.unwrap();

    let err = manager
        .send_transaction(
            &sender.address,
            "0x00000000000000000000000000000000000000b2",
            "1",
            "wrongpass",
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Vault(VaultError::WrongPassword)));
    assert_eq!(manager.get_balance(&sender.address).await.unwrap(), "100");
}

#[tokio::test]
async fn session_expiry_forces_relogin() {
    let durable = memory();
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let vault = Arc::new(WalletVault::new(
        Arc::clone(&durable),
        Arc::new(Bip39Provider),
    ));
    let session = Arc::new(
        SessionManager::with_clock(
            memory(),
            Arc::clone(&durable),
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap(),
    );
    let manager = WalletManager::with_parts(
        vault,
        session,
        Arc::new(VirtualLedger::new()) as Arc<dyn LedgerClient>,
        durable,
    )
    .await
    .unwrap();

    let summary = manager.create_wallet("password123").await.unwrap();
    assert_eq!(
        manager.current_address().await.unwrap(),
        Some(summary.address.to_lowercase())
    );

    clock.advance(UNLOCK_WINDOW_MS + 1);
    assert_eq!(manager.current_address().await.unwrap(), None);
    assert!(matches!(
        manager.active_session().await.unwrap_err(),
        Error::Vault(VaultError::SessionExpired)
    ));

    manager.login(&summary.address, "password123").await.unwrap();
    assert_eq!(
        manager.current_address().await.unwrap(),
        Some(summary.address.to_lowercase())
    );
}

#[tokio::test]
async fn wallets_survive_process_restart_on_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tura.db");
    let ledger = Arc::new(VirtualLedger::new());

    let address = {
        let durable = Arc::new(SqliteStore::open(&path).unwrap()) as Arc<dyn KeyValueStore>;
        let manager = WalletManager::new(
            durable,
            memory(),
            Arc::clone(&ledger) as Arc<dyn LedgerClient>,
        )
        .await
        .unwrap();
        manager.create_wallet("password123").await.unwrap().address
    };

    // Fresh facade over the same database: the wallet is still there,
    // the session (tab-scoped) is not.
    let durable = Arc::new(SqliteStore::open(&path).unwrap()) as Arc<dyn KeyValueStore>;
    let manager = WalletManager::new(
        durable,
        memory(),
        Arc::clone(&ledger) as Arc<dyn LedgerClient>,
    )
    .await
    .unwrap();

    assert_eq!(manager.current_address().await.unwrap(), None);
    manager.login(&address, "password123").await.unwrap();
    assert_eq!(
        manager.current_address().await.unwrap(),
        Some(address.to_lowercase())
    );
}

#[tokio::test]
async fn logout_is_idempotent_and_total() {
    let (_, manager) = facade().await;
    manager.create_wallet("password123").await.unwrap();

    manager.logout().await.unwrap();
    manager.logout().await.unwrap();

    assert_eq!(manager.current_address().await.unwrap(), None);
    assert!(!manager.state().is_connected);
}

//! Key-value storage tiers.
//!
//! Two tiers share one interface: [`SqliteStore`] is the durable tier
//! and survives restarts, [`MemoryStore`] is the session-scoped tier and
//! dies with the process, the way browser tab storage dies with its tab.
//!
//! # Persisted layout
//!
//! Durable tier:
//! - `wallet_<lowercased address>` → sealed wallet record
//! - `last_wallet_address` → plaintext address hint (not a secret)
//! - `last_activity` → plaintext epoch-millisecond timestamp
//!
//! Session tier:
//! - `wallet_session` → sealed session record
//!
//! Writers in separate processes sharing one durable database race
//! last-writer-wins; no cross-process transaction isolation is provided.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{Connection, params};
use tokio::sync::RwLock;

use crate::error::VaultError;

/// Durable-tier key prefix for sealed wallet records.
pub const WALLET_KEY_PREFIX: &str = "wallet_";
/// Session-tier key holding the sealed session record.
pub const SESSION_KEY: &str = "wallet_session";
/// Durable-tier key holding the last-used wallet address hint.
pub const LAST_WALLET_KEY: &str = "last_wallet_address";
/// Durable-tier key holding the last-activity timestamp.
pub const LAST_ACTIVITY_KEY: &str = "last_activity";

/// String key-value storage behind a vault tier.
///
/// All failures surface as [`VaultError::StorageUnavailable`]; callers
/// degrade (no session possible) rather than crash.
#[async_trait]
pub trait KeyValueStore: Send + Sync + fmt::Debug {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, VaultError>;

    /// Store `value` under `key`, replacing any existing value.
    async fn set(&self, key: &str, value: &str) -> Result<(), VaultError>;

    /// Remove the value stored under `key`. Missing keys are a no-op.
    async fn remove(&self, key: &str) -> Result<(), VaultError>;

    /// Enumerate every stored key.
    async fn keys(&self) -> Result<Vec<String>, VaultError>;
}

/// In-memory store backed by `tokio::sync::RwLock<HashMap>`.
///
/// Backs the session tier: contents are dropped with the value, so each
/// process gets an independent session lifecycle. Also convenient as a
/// durable-tier stand-in for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), VaultError> {
        self.entries
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), VaultError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, VaultError> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// SQLite-backed durable store.
///
/// Cloneable via `Arc<Mutex<Connection>>` — multiple handles may share a
/// single database. Schema is auto-created on construction. All blocking
/// I/O is offloaded to the tokio blocking thread pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a database at `path` and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::StorageUnavailable`] when the database
    /// cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VaultError> {
        let conn = Connection::open(path.as_ref()).map_err(|e| VaultError::storage(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Opens an ephemeral in-memory database (data lost on drop).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::StorageUnavailable`] when the database
    /// cannot be opened or initialized.
    pub fn in_memory() -> Result<Self, VaultError> {
        let conn = Connection::open_in_memory().map_err(|e| VaultError::storage(e.to_string()))?;
        Self::from_connection(conn)
    }

    /// Wraps an existing [`Connection`], applying pragmas and schema setup.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::StorageUnavailable`] when schema setup fails.
    pub fn from_connection(conn: Connection) -> Result<Self, VaultError> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = 5000;",
        )
        .map_err(|e| VaultError::storage(e.to_string()))?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .map_err(|e| VaultError::storage(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Bridges a synchronous closure onto the tokio blocking thread pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T, VaultError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|e| VaultError::storage(e.to_string()))?;
            f(&guard).map_err(|e| VaultError::storage(e.to_string()))
        })
        .await
        .map_err(|e| VaultError::storage(e.to_string()))?
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, VaultError> {
        let key = key.to_owned();
        self.blocking(move |conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), VaultError> {
        let key = key.to_owned();
        let value = value.to_owned();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now')) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
                 updated_at = excluded.updated_at",
                params![key, value],
            )
            .map(|_| ())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<(), VaultError> {
        let key = key.to_owned();
        self.blocking(move |conn| {
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
                .map(|_| ())
        })
        .await
    }

    async fn keys(&self) -> Result<Vec<String>, VaultError> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM kv ORDER BY key ASC")?;
            stmt.query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }
}

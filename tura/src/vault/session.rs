//! Unlocked-session lifecycle.
//!
//! At most one session exists per process: a cached unlock password with
//! an expiry, sealed under a process-local random key into the session
//! tier. The state machine is `NoSession → Active → (Expired |
//! LoggedOut)`; both terminal states read back as "no session" and are
//! distinguished only in the debug log.
//!
//! Every [`SessionManager::validate`] call checks the unlock window and
//! the inactivity ceiling, refreshes the activity timestamp, and slides
//! the expiry forward when little lifetime remains — forward only, never
//! backward. Because a read mutates stored state, the whole read-refresh
//! path is serialized behind a mutex.
//!
//! Storage-tier failures during validation degrade to "no session
//! possible" instead of erroring; only caller-initiated transitions
//! ([`SessionManager::begin`], [`SessionManager::end`]) report them.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::envelope;
use super::kdf;
use super::record::SessionRecord;
use super::storage::{KeyValueStore, LAST_ACTIVITY_KEY, SESSION_KEY};
use crate::error::VaultError;

/// Session lifetime granted by `begin` and by each renewal.
pub const UNLOCK_WINDOW_MS: i64 = 5 * 60 * 1_000;
/// Maximum allowed gap between operations before force-expiry.
pub const INACTIVITY_CEILING_MS: i64 = 30 * 60 * 1_000;
/// Remaining lifetime below which a validate call renews the session.
pub const RENEWAL_THRESHOLD_MS: i64 = 60 * 1_000;

/// Millisecond clock abstraction so expiry logic is testable.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant, epoch milliseconds.
    fn now_millis(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Deterministic clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `start_millis`.
    #[must_use]
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_millis),
        }
    }

    /// Move the clock forward by `delta_millis`.
    pub fn advance(&self, delta_millis: i64) {
        self.millis.fetch_add(delta_millis, Ordering::SeqCst);
    }

    /// Pin the clock to `millis`.
    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Owner of the single unlocked session.
pub struct SessionManager {
    session_store: Arc<dyn KeyValueStore>,
    durable_store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    // Process-local sealing key, rotated on end(). The mutex doubles as
    // the serialization point for validate()'s read-refresh path.
    seal_key: Mutex<Zeroizing<String>>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager over the given tiers with the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedEnvironment`] when no entropy is
    /// available for the process-local sealing key.
    pub fn new(
        session_store: Arc<dyn KeyValueStore>,
        durable_store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, VaultError> {
        Self::with_clock(session_store, durable_store, Arc::new(SystemClock))
    }

    /// Creates a manager with an injected clock.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::UnsupportedEnvironment`] when no entropy is
    /// available for the process-local sealing key.
    pub fn with_clock(
        session_store: Arc<dyn KeyValueStore>,
        durable_store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, VaultError> {
        Ok(Self {
            session_store,
            durable_store,
            clock,
            seal_key: Mutex::new(random_seal_key()?),
        })
    }

    /// Start a session for `password`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::StorageUnavailable`] when either tier
    /// rejects the write.
    pub async fn begin(&self, password: &str) -> Result<(), VaultError> {
        let seal_key = self.seal_key.lock().await;
        let now = self.clock.now_millis();
        let record = SessionRecord {
            password: password.to_owned(),
            expires_at: now + UNLOCK_WINDOW_MS,
        };
        let blob = envelope::seal(&record, &seal_key)?;
        self.session_store.set(SESSION_KEY, &blob).await?;
        self.durable_store
            .set(LAST_ACTIVITY_KEY, &now.to_string())
            .await?;
        debug!(expires_at = record.expires_at, "session started");
        Ok(())
    }

    /// Return the active session record, refreshing its bookkeeping.
    ///
    /// `None` — never an error — when there is no session, the stored
    /// envelope does not open, the inactivity ceiling was exceeded, or
    /// the unlock window has lapsed.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidFormat`] only if re-sealing a
    /// renewed record fails; storage failures degrade to `None`.
    pub async fn validate(&self) -> Result<Option<SessionRecord>, VaultError> {
        let mut seal_key = self.seal_key.lock().await;

        let blob = match self.session_store.get(SESSION_KEY).await {
            Ok(Some(blob)) => blob,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(error = %e, "session tier unavailable");
                return Ok(None);
            }
        };
        let Ok(record) = envelope::open::<SessionRecord>(&blob, &seal_key) else {
            // A blob sealed by another process or before a key rotation
            // reads as no session.
            debug!("session envelope unreadable");
            return Ok(None);
        };

        let now = self.clock.now_millis();
        let last_activity = match self.durable_store.get(LAST_ACTIVITY_KEY).await {
            Ok(value) => value.and_then(|v| v.parse::<i64>().ok()).unwrap_or(0),
            Err(e) => {
                warn!(error = %e, "durable tier unavailable");
                return Ok(None);
            }
        };
        if now.saturating_sub(last_activity) > INACTIVITY_CEILING_MS {
            debug!("session expired by inactivity ceiling");
            if let Err(e) = self.clear(&mut seal_key).await {
                warn!(error = %e, "failed to clear expired session");
            }
            return Ok(None);
        }
        if record.expires_at <= now {
            debug!(expires_at = record.expires_at, "session expired by unlock window");
            return Ok(None);
        }

        if let Err(e) = self
            .durable_store
            .set(LAST_ACTIVITY_KEY, &now.to_string())
            .await
        {
            warn!(error = %e, "failed to refresh activity timestamp");
        }

        if record.expires_at - now < RENEWAL_THRESHOLD_MS {
            // Slide the window forward; never backward.
            let renewed = SessionRecord {
                password: record.password.clone(),
                expires_at: now + UNLOCK_WINDOW_MS,
            };
            let blob = envelope::seal(&renewed, &seal_key)?;
            if let Err(e) = self.session_store.set(SESSION_KEY, &blob).await {
                warn!(error = %e, "failed to persist renewed session");
                return Ok(Some(record));
            }
            debug!(expires_at = renewed.expires_at, "session renewed");
            return Ok(Some(renewed));
        }
        Ok(Some(record))
    }

    /// End the session and clear its bookkeeping. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::StorageUnavailable`] when a tier rejects
    /// the removal.
    pub async fn end(&self) -> Result<(), VaultError> {
        let mut seal_key = self.seal_key.lock().await;
        self.clear(&mut seal_key).await
    }

    async fn clear(&self, seal_key: &mut Zeroizing<String>) -> Result<(), VaultError> {
        self.session_store.remove(SESSION_KEY).await?;
        self.durable_store.remove(LAST_ACTIVITY_KEY).await?;
        *seal_key = random_seal_key()?;
        debug!("session cleared");
        Ok(())
    }
}

fn random_seal_key() -> Result<Zeroizing<String>, VaultError> {
    let mut raw = Zeroizing::new([0u8; 32]);
    kdf::random_bytes(raw.as_mut())?;
    Ok(Zeroizing::new(hex::encode(raw.as_ref())))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::vault::storage::MemoryStore;

    const T0: i64 = 1_700_000_000_000;
    const MINUTE_MS: i64 = 60 * 1_000;

    struct Harness {
        clock: Arc<ManualClock>,
        session_store: Arc<MemoryStore>,
        manager: SessionManager,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(T0));
        let session_store = Arc::new(MemoryStore::new());
        let durable_store = Arc::new(MemoryStore::new());
        let manager = SessionManager::with_clock(
            Arc::clone(&session_store) as Arc<dyn KeyValueStore>,
            durable_store,
            Arc::clone(&clock) as Arc<dyn Clock>,
        )
        .unwrap();
        Harness {
            clock,
            session_store,
            manager,
        }
    }

    mod lifecycle {
        use super::*;

        #[tokio::test]
        async fn begin_then_validate_returns_record() {
            let h = harness();
            h.manager.begin("password123").await.unwrap();

            let record = h.manager.validate().await.unwrap().unwrap();
            assert_eq!(record.password, "password123");
            assert_eq!(record.expires_at, T0 + UNLOCK_WINDOW_MS);
        }

        #[tokio::test]
        async fn validate_without_begin_is_none() {
            let h = harness();
            assert!(h.manager.validate().await.unwrap().is_none());
        }

        #[tokio::test]
        async fn begin_replaces_existing_session() {
            let h = harness();
            h.manager.begin("first-password").await.unwrap();
            h.manager.begin("second-password").await.unwrap();

            let record = h.manager.validate().await.unwrap().unwrap();
            assert_eq!(record.password, "second-password");
        }

        #[tokio::test]
        async fn end_is_idempotent() {
            let h = harness();
            h.manager.begin("password123").await.unwrap();
            h.manager.end().await.unwrap();
            h.manager.end().await.unwrap();
            assert!(h.manager.validate().await.unwrap().is_none());
        }

        #[tokio::test]
        async fn begin_after_end_starts_fresh() {
            let h = harness();
            h.manager.begin("password123").await.unwrap();
            h.manager.end().await.unwrap();
            h.manager.begin("password123").await.unwrap();
            assert!(h.manager.validate().await.unwrap().is_some());
        }
    }

    mod expiry {
        use super::*;

        #[tokio::test]
        async fn expires_after_unlock_window() {
            let h = harness();
            h.manager.begin("password123").await.unwrap();

            h.clock.advance(UNLOCK_WINDOW_MS + 1);
            assert!(h.manager.validate().await.unwrap().is_none());
        }

        #[tokio::test]
        async fn window_expiry_leaves_blob_in_place() {
            // Expired-by-window is terminal but not destructive; only the
            // inactivity ceiling tears the session down.
            let h = harness();
            h.manager.begin("password123").await.unwrap();

            h.clock.advance(6 * MINUTE_MS);
            assert!(h.manager.validate().await.unwrap().is_none());
            assert!(
                h.session_store
                    .get(SESSION_KEY)
                    .await
                    .unwrap()
                    .is_some()
            );
        }

        #[tokio::test]
        async fn inactivity_ceiling_clears_session() {
            let h = harness();
            h.manager.begin("password123").await.unwrap();

            h.clock.advance(INACTIVITY_CEILING_MS + 1);
            assert!(h.manager.validate().await.unwrap().is_none());
            assert!(h.session_store.get(SESSION_KEY).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn expiry_boundary_is_exclusive() {
            let h = harness();
            h.manager.begin("password123").await.unwrap();

            // expires_at == now reads as expired.
            h.clock.advance(UNLOCK_WINDOW_MS);
            assert!(h.manager.validate().await.unwrap().is_none());
        }
    }

    mod sliding_window {
        use super::*;

        #[tokio::test]
        async fn frequent_validation_keeps_session_alive_indefinitely() {
            let h = harness();
            h.manager.begin("password123").await.unwrap();

            // 4.5-minute cadence: each validate lands inside the renewal
            // threshold and slides the window. Total elapsed time far
            // exceeds the raw unlock window.
            for _ in 0..10 {
                h.clock.advance(UNLOCK_WINDOW_MS - 30 * 1_000);
                assert!(h.manager.validate().await.unwrap().is_some());
            }
        }

        #[tokio::test]
        async fn renewal_slides_expiry_forward_only() {
            let h = harness();
            h.manager.begin("password123").await.unwrap();
            let original = h.manager.validate().await.unwrap().unwrap().expires_at;

            h.clock.advance(UNLOCK_WINDOW_MS - 30 * 1_000);
            let renewed = h.manager.validate().await.unwrap().unwrap().expires_at;
            assert!(renewed > original);
            assert_eq!(renewed, h.clock.now_millis() + UNLOCK_WINDOW_MS);
        }

        #[tokio::test]
        async fn no_renewal_with_ample_lifetime_left() {
            let h = harness();
            h.manager.begin("password123").await.unwrap();

            h.clock.advance(MINUTE_MS);
            let record = h.manager.validate().await.unwrap().unwrap();
            assert_eq!(record.expires_at, T0 + UNLOCK_WINDOW_MS);
        }
    }

    mod degraded_storage {
        use super::*;
        use async_trait::async_trait;

        #[derive(Debug)]
        struct FailingStore;

        #[async_trait]
        impl KeyValueStore for FailingStore {
            async fn get(&self, _key: &str) -> Result<Option<String>, VaultError> {
                Err(VaultError::storage("tier offline"))
            }
            async fn set(&self, _key: &str, _value: &str) -> Result<(), VaultError> {
                Err(VaultError::storage("tier offline"))
            }
            async fn remove(&self, _key: &str) -> Result<(), VaultError> {
                Err(VaultError::storage("tier offline"))
            }
            async fn keys(&self) -> Result<Vec<String>, VaultError> {
                Err(VaultError::storage("tier offline"))
            }
        }

        #[tokio::test]
        async fn validate_degrades_to_none() {
            let manager = SessionManager::with_clock(
                Arc::new(FailingStore),
                Arc::new(MemoryStore::new()),
                Arc::new(ManualClock::new(T0)),
            )
            .unwrap();
            assert!(manager.validate().await.unwrap().is_none());
        }

        #[tokio::test]
        async fn begin_surfaces_storage_failure() {
            let manager = SessionManager::with_clock(
                Arc::new(FailingStore),
                Arc::new(MemoryStore::new()),
                Arc::new(ManualClock::new(T0)),
            )
            .unwrap();
            let err = manager.begin("password123").await.unwrap_err();
            assert!(matches!(err, VaultError::StorageUnavailable(_)));
        }
    }

    mod clock {
        use super::*;

        #[test]
        fn manual_clock_advances_and_pins() {
            let clock = ManualClock::new(10);
            assert_eq!(clock.now_millis(), 10);
            clock.advance(5);
            assert_eq!(clock.now_millis(), 15);
            clock.set(100);
            assert_eq!(clock.now_millis(), 100);
        }

        #[test]
        fn system_clock_is_monotonic_enough() {
            let clock = SystemClock;
            let a = clock.now_millis();
            let b = clock.now_millis();
            assert!(b >= a);
        }
    }
}

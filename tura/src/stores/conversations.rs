//! Chat transcript persistence.

use std::sync::Arc;

use tracing::warn;

use crate::agent::ChatEntry;
use crate::error::Result;
use crate::vault::KeyValueStore;

/// Keyed transcript blobs in the durable tier.
///
/// Keys follow `chat_<address>_<agent>`; a transcript is one JSON array.
/// Loading is deliberately forgiving — a missing or corrupt blob reads
/// as an empty conversation.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    store: Arc<dyn KeyValueStore>,
}

impl ConversationStore {
    /// Creates a store over the durable tier.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load the transcript stored under `key`, empty when absent or
    /// unreadable.
    pub async fn load(&self, key: &str) -> Vec<ChatEntry> {
        match self.store.get(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(key, error = %e, "transcript unreadable, starting fresh");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(key, error = %e, "transcript load failed");
                Vec::new()
            }
        }
    }

    /// Persist `entries` under `key`, replacing the previous transcript.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn save(&self, key: &str, entries: &[ChatEntry]) -> Result<()> {
        let json = serde_json::to_string(entries)?;
        self.store.set(key, &json).await?;
        Ok(())
    }
}

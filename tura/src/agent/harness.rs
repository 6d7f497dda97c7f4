//! Conversation harness.
//!
//! [`ChatSession`] wraps a [`Persona`] with the shared chat mechanics:
//! transcript persistence keyed by wallet address, history trimming,
//! and normalization of persona failures into safe user-facing text.

use tracing::warn;

use super::{ChatEntry, Persona};
use crate::error::{AgentError, Error};
use crate::stores::ConversationStore;

/// Transcript entries kept per conversation.
pub const MAX_TRANSCRIPT_LEN: usize = 100;

const GUEST: &str = "guest";

/// A persona plus its persisted conversation.
#[derive(Debug)]
pub struct ChatSession<P> {
    persona: P,
    conversations: ConversationStore,
    address: Option<String>,
    transcript: Vec<ChatEntry>,
}

impl<P: Persona> ChatSession<P> {
    /// Creates a session with no wallet bound; guest transcripts are
    /// not persisted.
    pub async fn new(persona: P, conversations: ConversationStore) -> Self {
        let mut session = Self {
            persona,
            conversations,
            address: None,
            transcript: Vec::new(),
        };
        session.reload().await;
        session
    }

    /// Bind the session to a wallet address (or back to guest),
    /// switching to that wallet's transcript.
    pub async fn set_current_address(&mut self, address: Option<String>) {
        if self.address != address {
            self.address = address;
            self.reload().await;
        }
    }

    /// Process one user message and return the persona's reply.
    ///
    /// Failures inside the persona never escape as errors: the failed
    /// user entry is dropped from the transcript and a safe message
    /// becomes the reply, so the conversation stays usable.
    pub async fn process(&mut self, text: &str) -> String {
        if text.trim().is_empty() {
            return String::new();
        }

        self.transcript.push(ChatEntry::user(text));
        self.save().await;

        match self.persona.handle(text).await {
            Ok(reply) => {
                self.transcript.push(ChatEntry::agent(&reply));
                self.trim();
                self.save().await;
                reply
            }
            Err(err) => {
                warn!(agent = self.persona.name(), error = %err, "persona failed");
                self.transcript.pop();
                let reply = user_facing_message(&err);
                self.transcript.push(ChatEntry::agent(&reply));
                self.save().await;
                reply
            }
        }
    }

    /// The persona driving this session.
    pub fn persona(&self) -> &P {
        &self.persona
    }

    /// The in-memory transcript.
    #[must_use]
    pub fn messages(&self) -> &[ChatEntry] {
        &self.transcript
    }

    /// Drop the transcript, in memory and in storage.
    pub async fn clear(&mut self) {
        self.transcript.clear();
        self.save().await;
    }

    fn storage_key(&self) -> String {
        let owner = self.address.as_deref().unwrap_or(GUEST);
        let name = self.persona.name().to_lowercase().replace(' ', "_");
        format!("chat_{owner}_{name}")
    }

    async fn reload(&mut self) {
        self.transcript = if self.address.is_none() {
            Vec::new()
        } else {
            self.conversations.load(&self.storage_key()).await
        };
    }

    async fn save(&self) {
        if self.address.is_none() {
            return;
        }
        if let Err(e) = self
            .conversations
            .save(&self.storage_key(), &self.transcript)
            .await
        {
            warn!(agent = self.persona.name(), error = %e, "transcript save failed");
        }
    }

    fn trim(&mut self) {
        if self.transcript.len() > MAX_TRANSCRIPT_LEN {
            let excess = self.transcript.len() - MAX_TRANSCRIPT_LEN;
            self.transcript.drain(..excess);
        }
    }
}

// Persona failures reach the user as category-safe text: wallet and
// ledger messages are already scrubbed of secret material, everything
// else collapses to a generic line.
fn user_facing_message(err: &Error) -> String {
    match err {
        Error::Agent(AgentError::Classifier(_)) => {
            "I am temporarily unable to process requests. Please try again later.".to_owned()
        }
        Error::Vault(e) => e.to_string(),
        Error::Ledger(e) => e.to_string(),
        _ => "I encountered an unexpected error. Please try again.".to_owned(),
    }
}

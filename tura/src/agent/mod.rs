//! Agent persona layer.
//!
//! Personas turn natural-language chat into wallet operations. Each
//! persona owns a small conversational state machine behind the
//! [`Persona`] trait; [`ChatSession`] wraps a persona with transcript
//! persistence and error normalization.
//!
//! Intent recognition is consumed as an opaque function behind
//! [`IntentClassifier`] — text in, label and confidence out. The crate
//! ships the deterministic [`KeywordClassifier`]; an LLM-backed
//! implementation plugs in through the same trait.

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

mod auto;
mod classifier;
mod deploy;
mod harness;
mod wallet_agent;

pub use auto::AutoWorkflow;
pub use classifier::KeywordClassifier;
pub use deploy::{DEPLOYMENT_FEE_TURA, DeployAgent};
pub use harness::{ChatSession, MAX_TRANSCRIPT_LEN};
pub use wallet_agent::WalletAgent;

use crate::error::AgentError;

/// Minimum classifier confidence before a persona acts on an intent.
pub const CONFIDENCE_THRESHOLD: f32 = 0.7;

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human.
    User,
    /// The persona.
    Agent,
}

/// One transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    /// Message text.
    pub text: String,
    /// RFC 3339 creation time.
    pub timestamp: String,
    /// Message author.
    pub sender: Sender,
}

impl ChatEntry {
    /// Entry authored by the user, stamped now.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now().to_rfc3339(),
            sender: Sender::User,
        }
    }

    /// Entry authored by the persona, stamped now.
    #[must_use]
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: Utc::now().to_rfc3339(),
            sender: Sender::Agent,
        }
    }
}

/// Classifier output: a label and how sure the backend is about it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Lowercase intent label, e.g. `"create_wallet"`.
    pub label: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

impl Intent {
    /// The "no idea" intent.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            label: "unknown".to_owned(),
            confidence: 0.0,
        }
    }

    /// Whether the confidence clears [`CONFIDENCE_THRESHOLD`].
    #[must_use]
    pub fn is_confident(&self) -> bool {
        self.confidence >= CONFIDENCE_THRESHOLD
    }
}

/// Opaque intent recognizer: text in, [`Intent`] out.
#[async_trait]
pub trait IntentClassifier: Send + Sync + fmt::Debug {
    /// Classify `text` into one intent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Classifier`] when the backend is
    /// unreachable.
    async fn classify(&self, text: &str) -> Result<Intent, AgentError>;
}

/// A conversational agent persona.
#[async_trait]
pub trait Persona: Send {
    /// Stable persona name, used in transcript keys.
    fn name(&self) -> &str;

    /// One-line description of what the persona does.
    fn description(&self) -> &str;

    /// Produce the reply to one user message.
    ///
    /// # Errors
    ///
    /// Implementations surface vault, ledger, and classifier failures;
    /// [`ChatSession`] normalizes them into safe user-facing text.
    async fn handle(&mut self, text: &str) -> crate::Result<String>;
}

#[async_trait]
impl<P: Persona + ?Sized> Persona for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn description(&self) -> &str {
        (**self).description()
    }

    async fn handle(&mut self, text: &str) -> crate::Result<String> {
        (**self).handle(text).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn confidence_threshold_is_inclusive() {
        let intent = Intent {
            label: "check_balance".into(),
            confidence: CONFIDENCE_THRESHOLD,
        };
        assert!(intent.is_confident());
        let below = Intent {
            label: "check_balance".into(),
            confidence: CONFIDENCE_THRESHOLD - 0.01,
        };
        assert!(!below.is_confident());
    }

    #[test]
    fn unknown_intent_is_never_confident() {
        assert!(!Intent::unknown().is_confident());
    }

    #[test]
    fn chat_entry_serde_uses_lowercase_senders() {
        let json = serde_json::to_string(&ChatEntry::user("hi")).unwrap();
        assert!(json.contains(r#""sender":"user""#));
    }
}

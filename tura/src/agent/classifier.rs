//! Deterministic keyword classifier.

use async_trait::async_trait;

use super::{Intent, IntentClassifier};
use crate::error::AgentError;

const MATCH_CONFIDENCE: f32 = 0.9;

/// Keyword-rule classifier used when no LLM backend is wired in.
///
/// Covers the labels the bundled personas understand. Rules run in
/// priority order so "deploy a new agent" does not read as wallet
/// creation.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    /// Creates the classifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl IntentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<Intent, AgentError> {
        let text = text.to_lowercase();
        let hit = |label: &str| {
            Ok(Intent {
                label: label.to_owned(),
                confidence: MATCH_CONFIDENCE,
            })
        };

        if text.contains("deploy") || (text.contains("register") && text.contains("agent")) {
            return hit("deploy_contract");
        }
        if text.contains("agent")
            && (text.contains("list") || text.contains("show") || text.contains("view"))
        {
            return hit("list_agents");
        }
        if text.contains("expense")
            || text.contains("usage")
            || text.contains("spent")
            || text.contains("fees")
        {
            return hit("show_expenses");
        }
        if text.contains("wallet") && (text.contains("create") || text.contains("new")) {
            return hit("create_wallet");
        }
        if text.contains("balance") {
            return hit("check_balance");
        }
        if text.contains("send") || text.contains("transfer") {
            return hit("send_tokens");
        }
        if text.contains("login") || text.contains("log in") || text.contains("sign in") {
            return hit("login");
        }
        Ok(Intent::unknown())
    }
}

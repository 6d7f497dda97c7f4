//! Deployed-agent registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AgentError, Result};
use crate::vault::KeyValueStore;

/// Durable-tier key holding the registry as a JSON array.
pub const AGENT_REGISTRY_KEY: &str = "agent_registry";

/// Lifecycle status of a registered agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentStatus {
    /// Deployed and usable.
    Valid,
    /// Superseded; kept for history.
    Deprecated,
    /// Built-in system agent.
    Official,
}

/// Metadata for one deployed agent contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Display name.
    pub name: String,
    /// What the agent does.
    pub description: String,
    /// Company or organization behind the agent.
    pub company: String,
    /// Optional social links, keyed by platform.
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
    /// `0x`-prefixed contract address; unique within the registry.
    pub contract_address: String,
    /// Wallet address of the deployer.
    pub owner: String,
    /// Display fee per request, e.g. `"0.1 TURA"`.
    pub fee_per_request: String,
    /// Lifecycle status.
    pub status: AgentStatus,
    /// Chain the contract lives on.
    pub chain_id: u64,
    /// RFC 3339 registration time.
    pub created_at: String,
}

/// Persistent collection of [`AgentRecord`]s.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl AgentRegistry {
    /// Creates a registry over the durable tier.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Register an agent.
    ///
    /// # Errors
    ///
    /// [`AgentError::InvalidContractAddress`] for malformed addresses,
    /// [`AgentError::DuplicateAgent`] when the contract address is
    /// already registered; storage failures propagate.
    pub async fn save(&self, record: AgentRecord) -> Result<()> {
        if !is_contract_address(&record.contract_address) {
            return Err(AgentError::InvalidContractAddress.into());
        }
        let mut records = self.all().await?;
        if records
            .iter()
            .any(|r| r.contract_address.eq_ignore_ascii_case(&record.contract_address))
        {
            return Err(AgentError::DuplicateAgent.into());
        }
        records.push(record);
        let json = serde_json::to_string(&records)?;
        self.store.set(AGENT_REGISTRY_KEY, &json).await?;
        Ok(())
    }

    /// Every registered agent. A corrupt registry blob reads as empty.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn all(&self) -> Result<Vec<AgentRecord>> {
        match self.store.get(AGENT_REGISTRY_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "agent registry unreadable, treating as empty");
                Vec::new()
            })),
            None => Ok(Vec::new()),
        }
    }

    /// Agents deployed by `owner` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn by_owner(&self, owner: &str) -> Result<Vec<AgentRecord>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|record| record.owner.eq_ignore_ascii_case(owner))
            .collect())
    }
}

fn is_contract_address(address: &str) -> bool {
    address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::vault::MemoryStore;

    fn sample_record(contract: &str, owner: &str) -> AgentRecord {
        AgentRecord {
            name: "MarketDataAgent".into(),
            description: "Streams market data".into(),
            company: "Tura Labs".into(),
            social_links: BTreeMap::new(),
            contract_address: contract.into(),
            owner: owner.into(),
            fee_per_request: "0.1 TURA".into(),
            status: AgentStatus::Valid,
            chain_id: 1337,
            created_at: "2025-06-01T12:00:00+00:00".into(),
        }
    }

    fn registry() -> AgentRegistry {
        AgentRegistry::new(Arc::new(MemoryStore::new()))
    }

    const CONTRACT_A: &str = "0x00000000000000000000000000000000000000c1";
    const CONTRACT_B: &str = "0x00000000000000000000000000000000000000c2";

    #[tokio::test]
    async fn save_and_list_round_trip() {
        let registry = registry();
        registry
            .save(sample_record(CONTRACT_A, "0xowner1"))
            .await
            .unwrap();

        let all = registry.all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].contract_address, CONTRACT_A);
    }

    #[tokio::test]
    async fn duplicate_contract_rejected_case_insensitively() {
        let registry = registry();
        registry
            .save(sample_record(CONTRACT_A, "0xowner1"))
            .await
            .unwrap();

        let err = registry
            .save(sample_record(&CONTRACT_A.to_uppercase().replace("0X", "0x"), "0xowner2"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Agent(AgentError::DuplicateAgent)));
    }

    #[tokio::test]
    async fn malformed_contract_rejected() {
        let registry = registry();
        for bad in ["", "0x123", "not-an-address", "0xgg000000000000000000000000000000000000c1"] {
            let err = registry.save(sample_record(bad, "0xowner")).await.unwrap_err();
            assert!(
                matches!(err, Error::Agent(AgentError::InvalidContractAddress)),
                "address: {bad}"
            );
        }
    }

    #[tokio::test]
    async fn by_owner_filters_case_insensitively() {
        let registry = registry();
        registry
            .save(sample_record(CONTRACT_A, "0xOwnerOne"))
            .await
            .unwrap();
        registry
            .save(sample_record(CONTRACT_B, "0xownertwo"))
            .await
            .unwrap();

        let mine = registry.by_owner("0xownerone").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].contract_address, CONTRACT_A);
        assert!(registry.by_owner("0xstranger").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupt_blob_reads_as_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set(AGENT_REGISTRY_KEY, "{ not json").await.unwrap();

        let registry = AgentRegistry::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
        assert!(registry.all().await.unwrap().is_empty());
    }
}

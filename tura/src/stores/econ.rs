//! Workflow-run fee accounting.
//!
//! Every automated workflow run is a [`WorkflowRun`] holding the
//! per-step [`WorkflowRecord`]s and the accumulated fee, persisted as
//! one JSON array so the personas can answer "show my expenses".

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::vault::KeyValueStore;

/// Durable-tier key holding all runs as a JSON array.
pub const WORKFLOW_RUNS_KEY: &str = "workflow_runs";

/// Terminal and non-terminal run states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Still executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Aborted or failed.
    Failed,
}

/// One step inside a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    /// RFC 3339 time the step was recorded.
    pub timestamp: String,
    /// Persona that performed the step.
    pub agent_name: String,
    /// Fee charged for the step, in whole tokens.
    pub fee: f64,
    /// Operation identifier, e.g. `"checkBalance"`.
    pub call_type: String,
    /// Wallet address the step acted for.
    pub address: String,
    /// Whether the step succeeded.
    pub success: bool,
    /// Free-form detail line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl WorkflowRecord {
    /// Create a successful zero-fee record stamped now.
    #[must_use]
    pub fn new(
        agent_name: impl Into<String>,
        call_type: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            agent_name: agent_name.into(),
            fee: 0.0,
            call_type: call_type.into(),
            address: address.into(),
            success: true,
            details: None,
        }
    }

    /// Attach a fee.
    #[must_use]
    pub fn with_fee(mut self, fee: f64) -> Self {
        self.fee = fee;
        self
    }

    /// Attach a detail line.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Mark the step failed.
    #[must_use]
    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}

/// One automated workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Run identifier.
    pub id: Uuid,
    /// RFC 3339 start time.
    pub start_time: String,
    /// RFC 3339 completion time, once terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Wallet address the run acted for.
    pub address: String,
    /// Sum of record fees.
    pub total_fee: f64,
    /// Ordered step records.
    pub records: Vec<WorkflowRecord>,
    /// Run state.
    pub status: RunStatus,
}

/// Persistent collection of [`WorkflowRun`]s.
#[derive(Debug, Clone)]
pub struct WorkflowLedger {
    store: Arc<dyn KeyValueStore>,
}

impl WorkflowLedger {
    /// Creates a ledger over the durable tier.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Open a new run for `address` and return its id.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn start_run(&self, address: &str) -> Result<Uuid> {
        let run = WorkflowRun {
            id: Uuid::new_v4(),
            start_time: Utc::now().to_rfc3339(),
            end_time: None,
            address: address.to_owned(),
            total_fee: 0.0,
            records: Vec::new(),
            status: RunStatus::Running,
        };
        let id = run.id;
        let mut runs = self.all().await?;
        runs.push(run);
        self.persist(&runs).await?;
        Ok(id)
    }

    /// Append a record to a run, accumulating its fee.
    ///
    /// Unknown run ids are a logged no-op.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn add_record(&self, run_id: Uuid, record: WorkflowRecord) -> Result<()> {
        let mut runs = self.all().await?;
        let Some(run) = runs.iter_mut().find(|r| r.id == run_id) else {
            warn!(%run_id, "record for unknown workflow run dropped");
            return Ok(());
        };
        run.total_fee += record.fee;
        run.records.push(record);
        self.persist(&runs).await
    }

    /// Mark a run terminal.
    ///
    /// Unknown run ids are a logged no-op.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn complete_run(&self, run_id: Uuid, success: bool) -> Result<()> {
        let mut runs = self.all().await?;
        let Some(run) = runs.iter_mut().find(|r| r.id == run_id) else {
            warn!(%run_id, "completion for unknown workflow run dropped");
            return Ok(());
        };
        run.end_time = Some(Utc::now().to_rfc3339());
        run.status = if success {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        self.persist(&runs).await
    }

    /// Every recorded run. A corrupt blob reads as empty.
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn all(&self) -> Result<Vec<WorkflowRun>> {
        match self.store.get(WORKFLOW_RUNS_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "workflow ledger unreadable, treating as empty");
                Vec::new()
            })),
            None => Ok(Vec::new()),
        }
    }

    /// Runs recorded for `address` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Storage failures propagate.
    pub async fn runs_for(&self, address: &str) -> Result<Vec<WorkflowRun>> {
        Ok(self
            .all()
            .await?
            .into_iter()
            .filter(|run| run.address.eq_ignore_ascii_case(address))
            .collect())
    }

    /// Flat per-request fee for a built-in persona.
    #[must_use]
    pub fn agent_fee(agent_name: &str) -> f64 {
        match agent_name {
            "MarketDataAgent" => 1.0,
            "StrategyAgent" => 0.01,
            _ => 0.0,
        }
    }

    async fn persist(&self, runs: &[WorkflowRun]) -> Result<()> {
        let json = serde_json::to_string(runs)?;
        self.store.set(WORKFLOW_RUNS_KEY, &json).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::vault::MemoryStore;

    fn ledger() -> WorkflowLedger {
        WorkflowLedger::new(Arc::new(MemoryStore::new()))
    }

    const ADDR: &str = "0x00000000000000000000000000000000000000a1";

    #[tokio::test]
    async fn run_accumulates_records_and_fees() {
        let ledger = ledger();
        let run_id = ledger.start_run(ADDR).await.unwrap();

        ledger
            .add_record(run_id, WorkflowRecord::new("WalletAgent", "checkBalance", ADDR))
            .await
            .unwrap();
        ledger
            .add_record(
                run_id,
                WorkflowRecord::new("AgentManager", "deployAgent", ADDR)
                    .with_fee(0.1)
                    .with_details("Contract deployed"),
            )
            .await
            .unwrap();

        let runs = ledger.runs_for(ADDR).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].records.len(), 2);
        assert!((runs[0].total_fee - 0.1).abs() < f64::EPSILON);
        assert_eq!(runs[0].status, RunStatus::Running);
    }

    #[tokio::test]
    async fn completion_is_terminal_with_end_time() {
        let ledger = ledger();
        let ok_run = ledger.start_run(ADDR).await.unwrap();
        let bad_run = ledger.start_run(ADDR).await.unwrap();

        ledger.complete_run(ok_run, true).await.unwrap();
        ledger.complete_run(bad_run, false).await.unwrap();

        let runs = ledger.runs_for(ADDR).await.unwrap();
        let ok = runs.iter().find(|r| r.id == ok_run).unwrap();
        let bad = runs.iter().find(|r| r.id == bad_run).unwrap();
        assert_eq!(ok.status, RunStatus::Completed);
        assert!(ok.end_time.is_some());
        assert_eq!(bad.status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn unknown_run_id_is_a_noop() {
        let ledger = ledger();
        ledger
            .add_record(Uuid::new_v4(), WorkflowRecord::new("x", "y", ADDR))
            .await
            .unwrap();
        ledger.complete_run(Uuid::new_v4(), true).await.unwrap();
        assert!(ledger.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn runs_filter_by_address() {
        let ledger = ledger();
        ledger.start_run(ADDR).await.unwrap();
        ledger
            .start_run("0x00000000000000000000000000000000000000b2")
            .await
            .unwrap();

        assert_eq!(ledger.runs_for(&ADDR.to_uppercase().replace("0X", "0x")).await.unwrap().len(), 1);
        assert_eq!(ledger.all().await.unwrap().len(), 2);
    }

    #[test]
    fn fee_table_matches_builtins() {
        assert!((WorkflowLedger::agent_fee("WalletAgent") - 0.0).abs() < f64::EPSILON);
        assert!((WorkflowLedger::agent_fee("MarketDataAgent") - 1.0).abs() < f64::EPSILON);
        assert!((WorkflowLedger::agent_fee("StrategyAgent") - 0.01).abs() < f64::EPSILON);
        assert!((WorkflowLedger::agent_fee("SomethingElse") - 0.0).abs() < f64::EPSILON);
    }
}

//! Application stores over the durable tier.
//!
//! Registries the agent personas read and write: deployed-agent
//! metadata, workflow-run fee accounting, and chat transcripts. Each
//! store persists as one JSON value in the durable key-value tier.

mod agents;
mod conversations;
mod econ;

pub use agents::{AGENT_REGISTRY_KEY, AgentRecord, AgentRegistry, AgentStatus};
pub use conversations::ConversationStore;
pub use econ::{WORKFLOW_RUNS_KEY, RunStatus, WorkflowLedger, WorkflowRecord, WorkflowRun};

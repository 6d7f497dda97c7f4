//! Automated setup-and-deploy workflow persona.
//!
//! One command runs the whole pipeline for the current wallet: check
//! the balance, top it up from the faucet when low, then deploy an
//! agent contract and charge the fee — recording every step in the
//! workflow ledger. The workflow refuses to run without an unlocked
//! wallet: auto-creating one would mean a credential nobody chose, so
//! wallet creation stays with the WalletAgent.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use super::Persona;
use super::deploy::DEPLOYMENT_FEE_TURA;
use crate::ledger::{CURRENCY_SYMBOL, VirtualLedger};
use crate::stores::{WorkflowLedger, WorkflowRecord};
use crate::vault::{WalletManager, kdf};

const LOW_BALANCE_TURA: f64 = 1.0;

/// The automated workflow runner.
#[derive(Debug)]
pub struct AutoWorkflow {
    manager: Arc<WalletManager>,
    ledger: Arc<VirtualLedger>,
    econ: WorkflowLedger,
    current_run: Option<Uuid>,
}

impl AutoWorkflow {
    /// Creates the workflow over the facade, the simulated chain, and
    /// the run ledger.
    #[must_use]
    pub fn new(
        manager: Arc<WalletManager>,
        ledger: Arc<VirtualLedger>,
        econ: WorkflowLedger,
    ) -> Self {
        Self {
            manager,
            ledger,
            econ,
            current_run: None,
        }
    }

    /// Run the pipeline: balance check, faucet top-up when low, fee
    /// deduction, deployment.
    ///
    /// # Errors
    ///
    /// Storage failures propagate; chain-level failures are reported in
    /// the reply and recorded against the run.
    pub async fn run_workflow(&mut self) -> crate::Result<String> {
        // A stale run from an interrupted invocation is closed as failed.
        if let Some(stale) = self.current_run.take() {
            self.econ.complete_run(stale, false).await?;
        }

        let Some(address) = self.manager.current_address().await? else {
            return Ok(format!(
                "No unlocked wallet. Create one with the WalletAgent first — a wallet needs a \
                 password only you know. Then say 'start workflow' again. (Deployment costs \
                 {DEPLOYMENT_FEE_TURA} {CURRENCY_SYMBOL}.)"
            ));
        };

        let run_id = self.econ.start_run(&address).await?;
        self.current_run = Some(run_id);

        let balance = self.manager.get_balance(&address).await?;
        self.econ
            .add_record(
                run_id,
                WorkflowRecord::new("WalletAgent", "checkBalance", &address)
                    .with_details(format!("Balance: {balance} {CURRENCY_SYMBOL}")),
            )
            .await?;

        let mut faucet_note = String::new();
        if balance.parse::<f64>().unwrap_or(0.0) < LOW_BALANCE_TURA {
            match self.ledger.distribute_faucet(&address).await {
                Ok(new_balance) => {
                    self.econ
                        .add_record(
                            run_id,
                            WorkflowRecord::new("WalletAgent", "requestFaucet", &address)
                                .with_details("Faucet tokens requested"),
                        )
                        .await?;
                    faucet_note = format!(
                        "Faucet tokens requested; your balance is now {new_balance} \
                         {CURRENCY_SYMBOL}.\n\n"
                    );
                }
                Err(err) => {
                    self.econ
                        .add_record(
                            run_id,
                            WorkflowRecord::new("WalletAgent", "requestFaucet", &address)
                                .failed()
                                .with_details(err.to_string()),
                        )
                        .await?;
                    self.econ.complete_run(run_id, false).await?;
                    self.current_run = None;
                    return Ok(format!("Failed to request tokens: {err}"));
                }
            }
        }

        let reply = match self.deploy(run_id, &address).await? {
            Ok(summary) => {
                self.econ.complete_run(run_id, true).await?;
                format!("{faucet_note}{summary}")
            }
            Err(message) => {
                self.econ.complete_run(run_id, false).await?;
                format!("{faucet_note}{message}")
            }
        };
        self.current_run = None;
        Ok(reply)
    }

    // Inner result distinguishes "reply-worthy failure" from real errors.
    async fn deploy(
        &self,
        run_id: Uuid,
        address: &str,
    ) -> crate::Result<Result<String, String>> {
        let fee: f64 = DEPLOYMENT_FEE_TURA.parse().unwrap_or(0.0);
        match self.ledger.deduct_fee(address, DEPLOYMENT_FEE_TURA).await {
            Ok(remaining) => {
                let contract_address = random_contract_address()?;
                self.econ
                    .add_record(
                        run_id,
                        WorkflowRecord::new("AgentManager", "deployAgent", address)
                            .with_fee(fee)
                            .with_details(format!("Contract deployed at {contract_address}")),
                    )
                    .await?;
                Ok(Ok(format!(
                    "Agent deployed successfully.\n\nContract address: {contract_address}\n\
                     Remaining balance: {remaining} {CURRENCY_SYMBOL}"
                )))
            }
            Err(err) => {
                self.econ
                    .add_record(
                        run_id,
                        WorkflowRecord::new("AgentManager", "deployAgent", address)
                            .failed()
                            .with_details(err.to_string()),
                    )
                    .await?;
                Ok(Err(format!("Failed to deploy agent: {err}")))
            }
        }
    }
}

#[async_trait]
impl Persona for AutoWorkflow {
    fn name(&self) -> &str {
        "TuraWorkflow"
    }

    fn description(&self) -> &str {
        "Automated workflow for wallet setup and agent registration"
    }

    async fn handle(&mut self, text: &str) -> crate::Result<String> {
        let lowered = text.to_lowercase();
        if lowered == "start workflow"
            || lowered.contains("start automated")
            || lowered.contains("run workflow")
        {
            return self.run_workflow().await;
        }
        Ok("Type 'start workflow' to begin the automated setup and deployment.".to_owned())
    }
}

fn random_contract_address() -> crate::Result<String> {
    let mut bytes = [0u8; 20];
    kdf::random_bytes(&mut bytes)?;
    Ok(format!("0x{}", hex::encode(bytes)))
}

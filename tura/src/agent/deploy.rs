//! Contract-deployment assistant persona.
//!
//! Walks the user through agent registration — name, description,
//! company, social links — then charges the deployment fee and records
//! the agent in the registry. Also answers "list my agents" and "show
//! my expenses".

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;

use super::{IntentClassifier, Persona};
use crate::error::LedgerError;
use crate::ledger::{CHAIN_ID, CURRENCY_SYMBOL, VirtualLedger};
use crate::stores::{AgentRecord, AgentRegistry, AgentStatus, WorkflowLedger};
use crate::vault::{WalletManager, kdf};

/// Fee charged for deploying an agent contract, in whole tokens.
pub const DEPLOYMENT_FEE_TURA: &str = "0.1";

static GITHUB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"github\.com/[\w-]+").expect("valid github pattern"));
static TWITTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"twitter\.com/[\w-]+").expect("valid twitter pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Idle,
    CollectingName,
    CollectingDescription,
    CollectingCompany,
    CollectingSocials,
    ConfirmingDeployment,
}

#[derive(Debug, Default)]
struct Draft {
    name: String,
    description: String,
    company: String,
    social_links: BTreeMap<String, String>,
}

/// The contract-deployment assistant.
#[derive(Debug)]
pub struct DeployAgent {
    manager: Arc<WalletManager>,
    classifier: Arc<dyn IntentClassifier>,
    ledger: Arc<VirtualLedger>,
    registry: AgentRegistry,
    econ: WorkflowLedger,
    step: Step,
    draft: Draft,
}

impl DeployAgent {
    /// Creates the persona over the facade, the simulated chain, and
    /// the registries.
    #[must_use]
    pub fn new(
        manager: Arc<WalletManager>,
        classifier: Arc<dyn IntentClassifier>,
        ledger: Arc<VirtualLedger>,
        registry: AgentRegistry,
        econ: WorkflowLedger,
    ) -> Self {
        Self {
            manager,
            classifier,
            ledger,
            registry,
            econ,
            step: Step::Idle,
            draft: Draft::default(),
        }
    }

    fn help() -> String {
        format!(
            "I can help you deploy and register TuraAgent contracts. Here's what I can do:\n\n\
             1. Deploy a new TuraAgent contract (costs {DEPLOYMENT_FEE_TURA} {CURRENCY_SYMBOL})\n   \
             Try: \"Deploy a new agent\"\n\n\
             2. List your registered agents\n   \
             Try: \"Show my agents\"\n\n\
             3. View your usage and expenses\n   \
             Try: \"Show expenses\"\n\n\
             Note: deploying needs a connected wallet holding at least \
             {DEPLOYMENT_FEE_TURA} {CURRENCY_SYMBOL}."
        )
    }

    fn reset(&mut self) {
        self.step = Step::Idle;
        self.draft = Draft::default();
    }

    fn start_registration(&mut self) -> String {
        self.reset();
        self.step = Step::CollectingName;
        "Let's deploy a new TuraAgent contract. First, what would you like to name your agent?"
            .to_owned()
    }

    async fn advance_registration(&mut self, text: &str) -> crate::Result<String> {
        let trimmed = text.trim();
        match self.step {
            Step::CollectingName => {
                if trimmed.is_empty() {
                    return Ok("Please provide a valid name for your agent.".to_owned());
                }
                self.draft.name = trimmed.to_owned();
                self.step = Step::CollectingDescription;
                Ok("Great. Now describe what your agent does.".to_owned())
            }
            Step::CollectingDescription => {
                if trimmed.is_empty() {
                    return Ok("Please provide a valid description for your agent.".to_owned());
                }
                self.draft.description = trimmed.to_owned();
                self.step = Step::CollectingCompany;
                Ok("Thanks. What company or organization is this agent associated with?".to_owned())
            }
            Step::CollectingCompany => {
                if trimmed.is_empty() {
                    return Ok("Please provide a valid company or organization name.".to_owned());
                }
                self.draft.company = trimmed.to_owned();
                self.step = Step::CollectingSocials;
                Ok(
                    "Almost there. Share your GitHub and/or Twitter links, or type 'skip'."
                        .to_owned(),
                )
            }
            Step::CollectingSocials => {
                if !trimmed.eq_ignore_ascii_case("skip") {
                    let github = GITHUB_RE.find(trimmed).map(|m| m.as_str().to_owned());
                    let twitter = TWITTER_RE.find(trimmed).map(|m| m.as_str().to_owned());
                    if github.is_none() && twitter.is_none() {
                        return Ok(
                            "Please provide valid GitHub/Twitter links or type 'skip' to continue \
                             without social links."
                                .to_owned(),
                        );
                    }
                    if let Some(github) = github {
                        self.draft.social_links.insert("github".to_owned(), github);
                    }
                    if let Some(twitter) = twitter {
                        self.draft.social_links.insert("twitter".to_owned(), twitter);
                    }
                }
                self.step = Step::ConfirmingDeployment;
                let socials = self
                    .draft
                    .social_links
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}\n"))
                    .collect::<String>();
                Ok(format!(
                    "Here's a summary of your agent:\n\
                     Name: {}\n\
                     Description: {}\n\
                     Company: {}\n{socials}\n\
                     Deploying this agent will cost {DEPLOYMENT_FEE_TURA} {CURRENCY_SYMBOL}. \
                     Type 'confirm' to proceed or 'cancel' to abort.",
                    self.draft.name, self.draft.description, self.draft.company
                ))
            }
            Step::ConfirmingDeployment => match trimmed.to_lowercase().as_str() {
                "confirm" => self.deploy().await,
                "cancel" => {
                    self.reset();
                    Ok("Registration cancelled. Let me know if you'd like to try again.".to_owned())
                }
                _ => Ok("Please type 'confirm' to proceed with deployment or 'cancel' to abort."
                    .to_owned()),
            },
            Step::Idle => Ok(Self::help()),
        }
    }

    async fn deploy(&mut self) -> crate::Result<String> {
        let Some(address) = self.manager.current_address().await? else {
            self.reset();
            return Ok(
                "No wallet found. Please create a wallet first using the WalletAgent.".to_owned(),
            );
        };

        let remaining = match self.ledger.deduct_fee(&address, DEPLOYMENT_FEE_TURA).await {
            Ok(remaining) => remaining,
            Err(LedgerError::InsufficientBalance) => {
                let balance = self.manager.get_balance(&address).await?;
                self.reset();
                return Ok(format!(
                    "Insufficient balance. Deploying an agent costs {DEPLOYMENT_FEE_TURA} \
                     {CURRENCY_SYMBOL}; your current balance is {balance} {CURRENCY_SYMBOL}. \
                     You can get test tokens from the WalletAgent's faucet."
                ));
            }
            Err(err) => {
                self.reset();
                return Err(err.into());
            }
        };

        let contract_address = random_contract_address()?;
        let record = AgentRecord {
            name: self.draft.name.clone(),
            description: self.draft.description.clone(),
            company: self.draft.company.clone(),
            social_links: self.draft.social_links.clone(),
            contract_address: contract_address.clone(),
            owner: address,
            fee_per_request: format!("{DEPLOYMENT_FEE_TURA} {CURRENCY_SYMBOL}"),
            status: AgentStatus::Valid,
            chain_id: CHAIN_ID,
            created_at: Utc::now().to_rfc3339(),
        };
        self.registry.save(record).await?;

        let summary = format!(
            "Agent successfully deployed and registered.\n\n\
             Contract address: {contract_address}\n\
             Name: {}\n\
             Description: {}\n\
             Company: {}\n\
             Remaining balance: {remaining} {CURRENCY_SYMBOL}\n\n\
             Say \"Show my agents\" to view your agents or \"Deploy a new agent\" to deploy \
             another.",
            self.draft.name, self.draft.description, self.draft.company
        );
        self.reset();
        Ok(summary)
    }

    async fn list_agents(&self) -> crate::Result<String> {
        let Some(address) = self.manager.current_address().await? else {
            return Ok(connect_first());
        };
        let agents = self.registry.by_owner(&address).await?;
        if agents.is_empty() {
            return Ok(
                "You haven't registered any agents yet. Try saying 'Deploy a new agent' to get \
                 started."
                    .to_owned(),
            );
        }
        let listing = agents
            .iter()
            .map(|agent| {
                format!(
                    "- {} ({})\n  Description: {}\n  Company: {}\n  Fee: {}",
                    agent.name,
                    short_contract(&agent.contract_address),
                    agent.description,
                    agent.company,
                    agent.fee_per_request
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(format!("Your registered agents:\n{listing}"))
    }

    async fn show_expenses(&self) -> crate::Result<String> {
        let Some(address) = self.manager.current_address().await? else {
            return Ok(connect_first());
        };
        let runs = self.econ.runs_for(&address).await?;
        if runs.is_empty() {
            return Ok("You haven't made any transactions yet.".to_owned());
        }

        let mut usage: HashMap<String, (u32, f64)> = HashMap::new();
        for run in &runs {
            for record in &run.records {
                let entry = usage.entry(record.agent_name.clone()).or_default();
                entry.0 += 1;
                entry.1 += record.fee;
            }
        }

        let mut lines: Vec<_> = usage.into_iter().collect();
        lines.sort_by(|a, b| a.0.cmp(&b.0));
        let mut response = String::from("Your agent usage summary:\n\n");
        let mut total = 0.0;
        for (agent_name, (count, fee)) in lines {
            response.push_str(&format!(
                "{agent_name}:\n  Uses: {count}\n  Total fees: {fee} {CURRENCY_SYMBOL}\n\n"
            ));
            total += fee;
        }
        response.push_str(&format!("Total spent: {total} {CURRENCY_SYMBOL}"));
        Ok(response)
    }
}

#[async_trait]
impl Persona for DeployAgent {
    fn name(&self) -> &str {
        "AgentManager"
    }

    fn description(&self) -> &str {
        "Deploy and register TuraAgent contracts with metadata collection"
    }

    async fn handle(&mut self, text: &str) -> crate::Result<String> {
        if self.step != Step::Idle {
            return self.advance_registration(text).await;
        }

        let intent = self.classifier.classify(text).await?;
        if self.manager.current_address().await?.is_none() && intent.label != "general_help" {
            return Ok(connect_first());
        }

        if intent.is_confident() {
            match intent.label.as_str() {
                "deploy_contract" => return Ok(self.start_registration()),
                "register_agent" => {
                    return Ok(
                        "Agent-only registration without contract deployment is not supported. \
                         Use 'Deploy a new agent' to create and register one."
                            .to_owned(),
                    );
                }
                "list_agents" => return self.list_agents().await,
                "show_expenses" => return self.show_expenses().await,
                _ => {}
            }
        }
        Ok(Self::help())
    }
}

fn connect_first() -> String {
    "Please connect your wallet first to interact with agents.".to_owned()
}

fn short_contract(address: &str) -> String {
    if address.len() < 10 {
        return address.to_owned();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

fn random_contract_address() -> crate::Result<String> {
    let mut bytes = [0u8; 20];
    kdf::random_bytes(&mut bytes)?;
    Ok(format!("0x{}", hex::encode(bytes)))
}

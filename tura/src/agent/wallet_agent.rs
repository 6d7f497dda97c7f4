//! Wallet assistant persona.
//!
//! Conversational front end for the wallet facade: creates wallets,
//! checks balances, sends tokens, and walks the user through login.
//! Password collection is a two-turn exchange tracked by a small state
//! machine, so the password never has to appear in the same message as
//! the request.

use std::sync::Arc;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use super::{IntentClassifier, Persona};
use crate::error::{Error, VaultError};
use crate::ledger::CURRENCY_SYMBOL;
use crate::vault::WalletManager;

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0x[a-fA-F0-9]{40}").expect("valid address pattern"));
static AMOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(\.\d+)?").expect("valid amount pattern"));

#[derive(Debug)]
enum Flow {
    Idle,
    AwaitingCreatePassword,
    AwaitingLoginPassword { address: String },
}

/// The wallet assistant.
#[derive(Debug)]
pub struct WalletAgent {
    manager: Arc<WalletManager>,
    classifier: Arc<dyn IntentClassifier>,
    flow: Flow,
}

impl WalletAgent {
    /// Creates the persona over the facade and a classifier.
    #[must_use]
    pub fn new(manager: Arc<WalletManager>, classifier: Arc<dyn IntentClassifier>) -> Self {
        Self {
            manager,
            classifier,
            flow: Flow::Idle,
        }
    }

    fn welcome() -> String {
        format!(
            "I can help you manage your wallet. Here's what I can do:\n\
             - create a new wallet\n\
             - check your balance\n\
             - send {CURRENCY_SYMBOL} to another address\n\
             - log in to an existing wallet\n\n\
             Just tell me what you'd like to do."
        )
    }

    async fn finish_create(&mut self, password: &str) -> crate::Result<String> {
        match self.manager.create_wallet(password).await {
            Ok(summary) => {
                let phrase = summary.mnemonic.as_deref().unwrap_or_default();
                Ok(format!(
                    "Wallet created successfully.\n\
                     Your wallet address: {}\n\n\
                     Write down your recovery phrase, it is shown only once:\n{}\n\n\
                     Your initial balance is 0 {CURRENCY_SYMBOL}.",
                    summary.address, phrase
                ))
            }
            Err(Error::Vault(VaultError::WeakPassword)) => {
                // Stay in the flow so the next message is the retry.
                self.flow = Flow::AwaitingCreatePassword;
                Ok("Password must be at least 8 characters long. Please try again:".to_owned())
            }
            Err(err) => Err(err),
        }
    }

    async fn finish_login(&mut self, address: &str, password: &str) -> crate::Result<String> {
        match self.manager.login(address, password).await {
            Ok(_) => Ok(
                "Logged in. You can now check your balance or send tokens.".to_owned(),
            ),
            // One uniform reply: an unknown address must read the same
            // as a wrong password.
            Err(Error::Vault(VaultError::WrongPassword | VaultError::WalletNotFound)) => {
                Ok("Login failed. Please check your password and try again.".to_owned())
            }
            Err(err) => Err(err),
        }
    }

    async fn check_balance(&self) -> crate::Result<String> {
        let Some(address) = self.manager.current_address().await? else {
            return Ok(login_first());
        };
        let balance = self.manager.get_balance(&address).await?;
        Ok(format!(
            "Your wallet ({}) holds {balance} {CURRENCY_SYMBOL}.",
            short_address(&address)
        ))
    }

    async fn send_tokens(&self, text: &str) -> crate::Result<String> {
        let Some(to) = ADDRESS_RE.find(text).map(|m| m.as_str().to_owned()) else {
            return Ok(send_usage());
        };
        // Strip the address before looking for the amount, or its hex
        // digits would match first.
        let cleaned = ADDRESS_RE.replace_all(text, "");
        let Some(amount) = AMOUNT_RE.find(&cleaned).map(|m| m.as_str().to_owned()) else {
            return Ok(send_usage());
        };

        let Ok(session) = self.manager.active_session().await else {
            return Ok(login_first());
        };
        let Some(from) = self.manager.current_address().await? else {
            return Ok(login_first());
        };

        let receipt = self
            .manager
            .send_transaction(&from, &to, &amount, &session.password)
            .await?;
        if !receipt.status {
            return Ok("Transaction failed. Please try again.".to_owned());
        }
        Ok(format!(
            "Sent {amount} {CURRENCY_SYMBOL}.\nTransaction hash: {}",
            receipt.transaction_hash
        ))
    }

    fn start_login(&mut self, text: &str) -> String {
        let Some(address) = ADDRESS_RE.find(text).map(|m| m.as_str().to_owned()) else {
            return "Please provide your wallet address to log in.".to_owned();
        };
        self.flow = Flow::AwaitingLoginPassword { address };
        "Please enter your wallet password:".to_owned()
    }
}

#[async_trait]
impl Persona for WalletAgent {
    fn name(&self) -> &str {
        "WalletAgent"
    }

    fn description(&self) -> &str {
        "Your personal wallet assistant for managing TURA transactions"
    }

    async fn handle(&mut self, text: &str) -> crate::Result<String> {
        match std::mem::replace(&mut self.flow, Flow::Idle) {
            Flow::AwaitingCreatePassword => return self.finish_create(text).await,
            Flow::AwaitingLoginPassword { address } => {
                return self.finish_login(&address, text).await;
            }
            Flow::Idle => {}
        }

        let intent = self.classifier.classify(text).await?;
        if intent.is_confident() {
            match intent.label.as_str() {
                "create_wallet" => {
                    self.flow = Flow::AwaitingCreatePassword;
                    return Ok(
                        "Please provide a password for your new wallet (minimum 8 characters):"
                            .to_owned(),
                    );
                }
                "check_balance" => return self.check_balance().await,
                "send_tokens" => return self.send_tokens(text).await,
                "login" => return Ok(self.start_login(text)),
                _ => {}
            }
        }
        Ok(Self::welcome())
    }
}

fn login_first() -> String {
    "You need to log in to your wallet first. Give me your wallet address and I'll help you log in."
        .to_owned()
}

fn send_usage() -> String {
    format!(
        "Please provide a recipient address and an amount, \
         for example: 'send 10 {CURRENCY_SYMBOL} to 0x...'."
    )
}

fn short_address(address: &str) -> String {
    if address.len() < 10 {
        return address.to_owned();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

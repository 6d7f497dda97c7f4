//! Tura chat bot CLI.
//!
//! Interactive front end for the Tura wallet agents: pick a persona and
//! talk to it over stdin, backed by a SQLite vault and the locally
//! simulated ledger.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tura::agent::{
    AutoWorkflow, ChatSession, DeployAgent, IntentClassifier, KeywordClassifier, Persona,
    WalletAgent,
};
use tura::ledger::{CURRENCY_SYMBOL, LedgerClient, VirtualLedger};
use tura::stores::{AgentRegistry, ConversationStore, WorkflowLedger};
use tura::vault::{KeyValueStore, MemoryStore, SqliteStore, WalletManager};

/// Tura - chat with the wallet agents
#[derive(Parser)]
#[command(name = "tura-bot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding the durable wallet database
    #[arg(short, long, env = "TURA_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session with a persona
    Chat {
        /// Persona to talk to
        #[arg(short, long, value_enum, default_value_t = PersonaKind::Wallet)]
        agent: PersonaKind,
    },
    /// List locally stored wallet addresses
    Wallets,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PersonaKind {
    /// Wallet assistant: create, balance, send, login
    Wallet,
    /// Contract-deployment assistant
    Deploy,
    /// Automated setup-and-deploy workflow
    Auto,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> tura::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let data_dir = cli.data_dir.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&data_dir)?;
    let durable =
        Arc::new(SqliteStore::open(data_dir.join("tura.db"))?) as Arc<dyn KeyValueStore>;
    let ledger = Arc::new(VirtualLedger::new());
    let manager = Arc::new(
        WalletManager::new(
            Arc::clone(&durable),
            Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>,
            Arc::clone(&ledger) as Arc<dyn LedgerClient>,
        )
        .await?,
    );

    match cli.command {
        Commands::Chat { agent } => chat(agent, manager, ledger, durable).await,
        Commands::Wallets => {
            let wallets = manager.list_stored_wallets().await?;
            if wallets.is_empty() {
                println!("No wallets stored yet.");
            }
            for address in wallets {
                println!("{address}");
            }
            Ok(())
        }
    }
}

async fn chat(
    kind: PersonaKind,
    manager: Arc<WalletManager>,
    ledger: Arc<VirtualLedger>,
    durable: Arc<dyn KeyValueStore>,
) -> tura::Result<()> {
    manager.spawn_connectivity_monitor(Duration::from_secs(10));

    let conversations = ConversationStore::new(Arc::clone(&durable));
    let classifier: Arc<dyn IntentClassifier> = Arc::new(KeywordClassifier::new());
    let persona: Box<dyn Persona> = match kind {
        PersonaKind::Wallet => Box::new(WalletAgent::new(
            Arc::clone(&manager),
            Arc::clone(&classifier),
        )),
        PersonaKind::Deploy => Box::new(DeployAgent::new(
            Arc::clone(&manager),
            Arc::clone(&classifier),
            Arc::clone(&ledger),
            AgentRegistry::new(Arc::clone(&durable)),
            WorkflowLedger::new(Arc::clone(&durable)),
        )),
        PersonaKind::Auto => Box::new(AutoWorkflow::new(
            Arc::clone(&manager),
            Arc::clone(&ledger),
            WorkflowLedger::new(Arc::clone(&durable)),
        )),
    };

    println!("{} - {}", persona.name(), persona.description());
    println!("The ledger is simulated locally; balances reset when the process exits.");
    println!("Type 'exit' to quit.\n");

    let mut session = ChatSession::new(persona, conversations).await;
    session
        .set_current_address(manager.current_address().await?)
        .await;

    let stdin = io::stdin();
    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = session.process(line).await;
        println!("{}> {reply}\n", session.persona().name());

        // Keep the transcript keyed to whichever wallet is unlocked.
        session
            .set_current_address(manager.current_address().await?)
            .await;
    }

    let info = manager.state();
    if info.is_connected {
        println!(
            "\nSession still active for {} ({} {CURRENCY_SYMBOL}).",
            info.address, info.balance
        );
    }
    manager.shutdown();
    Ok(())
}

//! agentry Invoice Reference Runtime: Demo CLI
//!
//! Runs one or both of the reference scenarios. Each scenario drives the
//! real agent loop, languages, registry, storage and transaction layer with a
//! scripted model and mock invoice data.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- invoice
//!   cargo run -p demo -- invoice --storage agent_storage.json --clear
//!   cargo run -p demo -- staged

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use agentry_contracts::error::AgentResult;
use agentry_core::traits::Storage;
use agentry_ref_invoice::scenarios::{invoice_pipeline, staged_ledger};
use agentry_storage::{InMemoryStorage, JsonFileStorage};

// ── CLI definition ────────────────────────────────────────────────────────────

/// agentry: goal-driven agent orchestration demo.
///
/// Each subcommand runs one or all of the reference scenarios.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "agentry invoice reference runtime demo",
    long_about = "Runs agentry reference scenarios showing the agent loop, tool dispatch,\n\
                  persistent storage, and staged transactions with rollback."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run both scenarios in sequence with in-memory storage.
    RunAll,
    /// Scenario 1: Invoice Pipeline (extract, store, list, terminate).
    Invoice {
        /// Persist storage to this JSON file instead of keeping it in memory.
        #[arg(long)]
        storage: Option<PathBuf>,
        /// Drop every stored collection before running.
        #[arg(long, requires = "storage")]
        clear: bool,
    },
    /// Scenario 2: Staged Ledger (review, commit, rollback, reject).
    Staged,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Initialize structured logging. Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::Invoice { storage, clear } => run_invoice(storage, clear),
        Command::Staged => staged_ledger::run_scenario(),
    };

    match result {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

fn run_all() -> AgentResult<()> {
    invoice_pipeline::run_scenario(Arc::new(InMemoryStorage::new()))?;
    staged_ledger::run_scenario()?;
    Ok(())
}

fn run_invoice(path: Option<PathBuf>, clear: bool) -> AgentResult<()> {
    let storage: Arc<dyn Storage> = match path {
        Some(path) => {
            info!(path = %path.display(), "using file storage");
            let storage = JsonFileStorage::open(path);
            if clear {
                storage.clear_all()?;
            }
            Arc::new(storage)
        }
        None => Arc::new(InMemoryStorage::new()),
    };
    invoice_pipeline::run_scenario(storage)
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("agentry: Goal-driven Agent Orchestration");
    println!("Invoice Reference Demo");
    println!("=======================================");
    println!();
    println!("Per iteration the agent loop:");
    println!("  [1] Builds a prompt from goals, available tools and memory");
    println!("  [2] Calls the model (rate limits retried with backoff)");
    println!("  [3] Parses the reply into a {{tool, args}} invocation");
    println!("  [4] Validates arguments and runs the tool");
    println!("  [5] Appends the reply and the result to memory; stops on a terminal tool");
    println!();
}

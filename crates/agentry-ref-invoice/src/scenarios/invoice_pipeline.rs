//! Scenario 1: Invoice Pipeline
//!
//! An agent using the fenced JSON action language processes one invoice:
//!
//! 1. The first reply has no action block. The loop records a parse error
//!    as an environment turn and asks again.
//! 2. `extract_invoice` runs the document through the `"fast"` model tier.
//! 3. `store_invoice` writes the fields to storage.
//! 4. `list_invoices` reads storage back.
//! 5. `terminate` ends the run.
//!
//! The agent is configured from `config/invoice-agent.toml`.

use std::sync::Arc;

use serde_json::json;

use agentry_config::AgentConfig;
use agentry_contracts::error::AgentResult;
use agentry_core::{
    context::ActionContext,
    traits::{ModelClient, Storage},
    Agent, Memory, RetryingModel,
};
use agentry_language::JsonActionLanguage;

use crate::{
    mock_data::{extracted_invoice, invoice_document},
    model::{json_action_reply, ExtractionModel, ScriptedModel},
    tools::{reference_registry, EXTRACTION_TIER, INVOICES_COLLECTION},
};

// ── Configuration ─────────────────────────────────────────────────────────────

/// The reference agent configuration.
pub const AGENT_CONFIG: &str = include_str!("../../config/invoice-agent.toml");

pub fn load_config() -> AgentResult<AgentConfig> {
    AgentConfig::from_toml_str(AGENT_CONFIG)
}

// ── Wiring ────────────────────────────────────────────────────────────────────

/// The replies a well-behaved model would give for invoice `number`.
pub fn script(number: &str) -> Vec<String> {
    let invoice = extracted_invoice(number).unwrap_or_else(|| json!({ "invoice_number": number }));
    vec![
        "Let me start by reading the invoice.".to_string(),
        json_action_reply("extract_invoice", json!({ "document": invoice_document(number) })),
        json_action_reply("store_invoice", json!({ "invoice": invoice })),
        json_action_reply("list_invoices", json!({})),
        json_action_reply("terminate", json!({ "message": format!("Stored invoice {number}.") })),
    ]
}

/// Build the invoice agent from `config`.
///
/// Tools are filtered by the configured tags. The context carries `storage`
/// and an `ExtractionModel` on the `"fast"` tier, wrapped in the configured
/// retry policy since tools call it outside the agent loop.
pub fn build_agent(
    config: &AgentConfig,
    model: Arc<dyn ModelClient>,
    storage: Arc<dyn Storage>,
) -> AgentResult<Agent> {
    let registry = reference_registry()?;
    let tags = config.tool_tags();
    let registry = if tags.is_empty() {
        registry
    } else {
        registry.subset(&tags)
    };

    let context = Arc::new(
        ActionContext::new()
            .with_storage(storage)
            .with_model(
                EXTRACTION_TIER,
                Arc::new(RetryingModel::new(ExtractionModel, config.retry_policy())),
            ),
    );

    Agent::builder(config.agent.name.as_str())
        .goals(config.sorted_goals())
        .language(JsonActionLanguage::new())
        .registry(registry)
        .model(model)
        .context(context)
        .retry(config.retry_policy())
        .build()
}

/// Run the configured agent on "Process invoice `number`".
pub fn process_invoice(
    number: &str,
    model: Arc<dyn ModelClient>,
    storage: Arc<dyn Storage>,
) -> AgentResult<Memory> {
    let config = load_config()?;
    let agent = build_agent(&config, model, storage)?.shared();
    let task = format!("Process invoice {number}");
    match config.agent.max_iterations {
        Some(limit) => agent.run_bounded(&task, None, limit),
        None => agent.run(&task, None),
    }
}

// ── Scenario runner ───────────────────────────────────────────────────────────

/// Run Scenario 1 against `storage`.
pub fn run_scenario(storage: Arc<dyn Storage>) -> AgentResult<()> {
    println!("=== Scenario 1: Invoice Pipeline ===");
    println!();

    let number = "INV-1";
    // One throttled call first, to show the retry policy at work.
    let model = Arc::new(ScriptedModel::new(script(number)).with_rate_limits(1));
    println!("  Task:     Process invoice {number}");
    println!("  Language: fenced JSON action blocks");
    println!("  Model:    scripted, {} replies, first call rate limited", script(number).len());
    println!();

    let memory = process_invoice(number, model.clone(), Arc::clone(&storage))?;

    println!("  Conversation ({} entries):", memory.len());
    super::print_memory(&memory);
    println!();

    let stored = storage.get_from_collection(INVOICES_COLLECTION, number)?;
    match stored {
        Some(invoice) => println!(
            "  Stored:   {} from {} totalling {}",
            number, invoice["vendor"], invoice["total"]
        ),
        None => println!("  Stored:   nothing (unexpected)"),
    }
    println!("  Model calls: {} (including the throttled one)", model.prompts().len());
    println!();
    println!("  Scenario 1 complete.");
    println!();
    Ok(())
}

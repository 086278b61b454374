//! Scenario 2: Staged Ledger
//!
//! An agent using structured tool calls stages ledger operations for review
//! before anything touches the ledger:
//!
//! Sub-case A: two postings within limits are staged, reviewed and committed.
//! Sub-case B: a posting followed by an over-limit payment is staged. The
//!             commit fails, the posting is rolled back, and the agent
//!             rejects the transaction.
//! Sub-case C: the same failure driven directly through `ActionTransaction`,
//!             without an agent, showing the rollback report.
//!
//! The model's closing plain-text reply is mapped to `terminate` by the
//! language's text fallback.

use std::sync::Arc;

use serde_json::{json, Value};

use agentry_contracts::{
    error::{AgentError, AgentResult},
    goal::Goal,
    prompt::Prompt,
};
use agentry_core::{Agent, Memory, RetryPolicy};
use agentry_language::FunctionCallingLanguage;
use agentry_txn::{tools::staging_actions, ActionTransaction, StagedActionEnvironment};

use crate::{
    ledger::{ledger_catalog, Ledger},
    model::{tool_call_reply, FnModel},
    tools::{reference_registry, SYSTEM_TAG},
};

/// What one staged batch left behind.
pub struct BatchRun {
    pub memory: Memory,
    pub staging: Arc<StagedActionEnvironment>,
    pub model_calls: usize,
}

fn goals() -> Vec<Goal> {
    vec![
        Goal::new(
            1,
            "Stage",
            "Stage every ledger change in a transaction. Never change the ledger directly.",
        ),
        Goal::new(
            2,
            "Review",
            "Review the staged transaction, then commit it. If the commit fails, reject the transaction.",
        ),
        Goal::new(3, "Report", "When finished, reply in plain text with the outcome."),
    ]
}

/// The transaction id from the most recent tool result that carries one.
fn latest_transaction_id(prompt: &Prompt) -> Option<String> {
    prompt.messages.iter().rev().find_map(|m| {
        serde_json::from_str::<Value>(&m.content)
            .ok()
            .and_then(|v| v["result"]["transaction_id"].as_str().map(str::to_string))
    })
}

/// Whether the most recent tool result succeeded.
fn last_call_succeeded(prompt: &Prompt) -> bool {
    prompt
        .messages
        .iter()
        .rev()
        .find_map(|m| serde_json::from_str::<Value>(&m.content).ok())
        .and_then(|v| v["tool_executed"].as_bool())
        .unwrap_or(false)
}

/// Drive an agent that stages `steps`, reviews, commits, and reports.
///
/// The model is scripted but reads the transaction id and the commit outcome
/// back out of the conversation, as a real model would.
pub fn run_batch(ledger: &Ledger, steps: Vec<(&'static str, Value)>) -> AgentResult<BatchRun> {
    let staging = Arc::new(StagedActionEnvironment::new());
    let mut registry = reference_registry()?.subset(&[SYSTEM_TAG]);
    for action in staging_actions(staging.clone(), Arc::new(ledger_catalog(ledger)?)) {
        registry.register(action)?;
    }

    let n = steps.len();
    let model = Arc::new(FnModel::new(move |call: usize, prompt: &Prompt| {
        if call == 0 {
            return Ok(tool_call_reply("begin_transaction", json!({})));
        }
        let id = latest_transaction_id(prompt).ok_or_else(|| AgentError::ModelCall {
            reason: "no transaction id in the conversation".to_string(),
        })?;
        let reply = match call {
            c if c <= n => {
                let (action, args) = &steps[c - 1];
                tool_call_reply(
                    "stage_action",
                    json!({ "transaction_id": id, "action": action, "args": args }),
                )
            }
            c if c == n + 1 => tool_call_reply("review_transaction", json!({ "transaction_id": id })),
            c if c == n + 2 => tool_call_reply("commit_transaction", json!({ "transaction_id": id })),
            c if c == n + 3 && last_call_succeeded(prompt) => {
                format!("Transaction {id} is committed and the ledger is updated.")
            }
            c if c == n + 3 => tool_call_reply("reject_transaction", json!({ "transaction_id": id })),
            _ => format!("Transaction {id} failed, was rolled back and has been rejected."),
        };
        Ok(reply)
    }));

    let agent = Agent::builder("ledger-agent")
        .goals(goals())
        .language(FunctionCallingLanguage::new().with_text_fallback("terminate"))
        .registry(registry)
        .model(model.clone())
        .retry(RetryPolicy::immediate(1))
        .build()?
        .shared();

    let memory = agent.run_bounded("Post this week's payables batch.", None, n + 5)?;
    Ok(BatchRun {
        memory,
        staging,
        model_calls: model.calls(),
    })
}

fn print_ledger(ledger: &Ledger) {
    let entries = ledger.entries();
    if entries.is_empty() {
        println!("  Ledger:   (empty)");
    }
    for e in entries {
        println!(
            "  Ledger:   #{} {:<8} {:<20} {:>10.2}  {}",
            e.id, e.kind, e.account, e.amount, e.memo
        );
    }
}

// ── Scenario runner ───────────────────────────────────────────────────────────

/// Run Scenario 2: Staged Ledger, three sub-cases.
pub fn run_scenario() -> AgentResult<()> {
    println!("=== Scenario 2: Staged Ledger ===");
    println!();

    // ── Sub-case A: batch within limits → committed ──────────────────────────

    {
        println!("  Sub-case A: two operations within the payment limit");
        let ledger = Ledger::default();
        let run = run_batch(
            &ledger,
            vec![
                ("post_entry", json!({ "account": "office-supplies", "amount": 100.0, "memo": "INV-1" })),
                ("pay_vendor", json!({ "vendor": "Harbor Office Supply", "amount": 100.0 })),
            ],
        )?;
        super::print_memory(&run.memory);
        print_ledger(&ledger);
        println!("  Model calls: {}", run.model_calls);
        println!("  RESULT: committed (expected)");
        println!();
    }

    // ── Sub-case B: over-limit payment → rolled back and rejected ────────────

    {
        println!("  Sub-case B: payment above the limit");
        let ledger = Ledger::default();
        let run = run_batch(
            &ledger,
            vec![
                ("post_entry", json!({ "account": "freight", "amount": 1425.5, "memo": "INV-2" })),
                ("pay_vendor", json!({ "vendor": "Northgate Logistics", "amount": 14255.0 })),
            ],
        )?;
        super::print_memory(&run.memory);
        print_ledger(&ledger);
        println!("  RESULT: rolled back and rejected (expected)");
        println!();
    }

    // ── Sub-case C: direct transaction, failure in the middle ────────────────

    {
        println!("  Sub-case C: ActionTransaction without an agent");
        let ledger = Ledger::new(1_000.0);
        let catalog = ledger_catalog(&ledger)?;
        let mut txn = ActionTransaction::new();
        txn.add(catalog.get("post_entry")?, args(json!({ "account": "rent", "amount": 1200.0 })))?;
        txn.add(catalog.get("pay_vendor")?, args(json!({ "vendor": "Cedar Ridge", "amount": 1800.0 })))?;
        txn.add(catalog.get("post_entry")?, args(json!({ "account": "utilities", "amount": 90.0 })))?;

        match txn.execute() {
            Err(AgentError::TransactionFailure { action, source, .. }) => {
                println!("  Failed at:     {action} ({source})");
                println!("  Executed left: {}", txn.executed().len());
                println!("  Status:        {}", txn.status());
            }
            Err(e) => println!("  Unexpected error: {e}"),
            Ok(_) => println!("  Unexpectedly succeeded"),
        }
        print_ledger(&ledger);
        println!("  RESULT: TransactionFailure with rollback (expected)");
        println!();
    }

    println!("  Scenario 2 complete.");
    println!();
    Ok(())
}

fn args(value: Value) -> agentry_contracts::invocation::Args {
    match value {
        Value::Object(map) => map,
        _ => Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use agentry_contracts::memory::MemoryType;
    use agentry_txn::TransactionStatus;

    use super::*;

    fn last_message(memory: &Memory) -> Value {
        let last = memory.last().unwrap();
        assert_eq!(last.kind, MemoryType::Environment);
        serde_json::from_str(&last.content).unwrap()
    }

    #[test]
    fn batch_within_limits_commits() {
        let ledger = Ledger::default();
        let run = run_batch(
            &ledger,
            vec![
                ("post_entry", json!({ "account": "rent", "amount": 1200.0 })),
                ("pay_vendor", json!({ "vendor": "Harbor", "amount": 100.0 })),
            ],
        )
        .unwrap();

        assert_eq!(ledger.entries().len(), 2);
        assert_eq!(ledger.balance(), 1100.0);
        // begin, 2 stages, review, commit, plain-text report
        assert_eq!(run.model_calls, 6);
        assert_eq!(run.memory.len(), 1 + 2 * 6);

        let report = last_message(&run.memory);
        assert!(report["result"]["message"].as_str().unwrap().contains("committed"));

        assert_eq!(run.staging.len(), 1);
    }

    #[test]
    fn over_limit_batch_rolls_back_and_is_rejected() {
        let ledger = Ledger::default();
        let run = run_batch(
            &ledger,
            vec![
                ("post_entry", json!({ "account": "freight", "amount": 450.0 })),
                ("pay_vendor", json!({ "vendor": "Northgate", "amount": 90_000.0 })),
            ],
        )
        .unwrap();

        assert!(ledger.entries().is_empty());
        // begin, 2 stages, review, failed commit, reject, plain-text report
        assert_eq!(run.model_calls, 7);

        let entries = run.memory.entries();
        let commit: Value = serde_json::from_str(&entries[10].content).unwrap();
        assert_eq!(commit["error_kind"], json!("tool_error"));
        assert!(commit["error"].as_str().unwrap().contains("pay_vendor"));

        let rejected: Value = serde_json::from_str(&entries[12].content).unwrap();
        assert_eq!(rejected["result"]["status"], json!("rejected"));
    }

    #[test]
    fn repeated_staged_action_is_fully_rolled_back() {
        let ledger = Ledger::default();
        let run = run_batch(
            &ledger,
            vec![
                ("post_entry", json!({ "account": "rent", "amount": 100.0 })),
                ("post_entry", json!({ "account": "freight", "amount": 200.0 })),
                ("pay_vendor", json!({ "vendor": "Northgate", "amount": 9_000.0 })),
            ],
        )
        .unwrap();

        assert!(ledger.entries().is_empty(), "left behind: {:?}", ledger.entries());
        assert_eq!(ledger.balance(), 0.0);
        // begin, 3 stages, review, failed commit, reject, plain-text report
        assert_eq!(run.model_calls, 8);
    }

    #[test]
    fn rejected_transaction_status_is_recorded() {
        let ledger = Ledger::default();
        let run = run_batch(
            &ledger,
            vec![("pay_vendor", json!({ "vendor": "Northgate", "amount": 90_000.0 }))],
        )
        .unwrap();

        let entries = run.memory.entries();
        let begun: Value = serde_json::from_str(&entries[2].content).unwrap();
        let id = begun["result"]["transaction_id"].as_str().unwrap();
        let id = agentry_contracts::execution::TransactionId::parse(id).unwrap();
        assert_eq!(run.staging.summary(&id).unwrap().status, TransactionStatus::Rejected);
    }

    #[test]
    fn review_happens_before_any_ledger_change() {
        let ledger = Ledger::default();
        let run = run_batch(
            &ledger,
            vec![("post_entry", json!({ "account": "rent", "amount": 10.0 }))],
        )
        .unwrap();

        let entries = run.memory.entries();
        // entries: task, begin pair, stage pair, review pair, ...
        let review: Value = serde_json::from_str(&entries[6].content).unwrap();
        assert_eq!(review["result"]["action_count"], json!(1));
        assert_eq!(review["result"]["steps"][0]["safety_questions"].as_array().unwrap().len(), 5);
    }
}

//! A mock accounts-payable ledger with reversible operations.
//!
//! Both operations append to the same entry list and reverse themselves by
//! removing the entry they created, identified by the id in their result.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde_json::{json, Value};

use agentry_contracts::{
    error::{AgentError, AgentResult},
    invocation::Args,
};
use agentry_txn::{tools::ReversibleCatalog, ReversalRecord, ReversibleAction};

/// Largest single vendor payment allowed without separate approval.
pub const DEFAULT_PAYMENT_LIMIT: f64 = 5_000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerEntry {
    pub id: u64,
    pub kind: &'static str,
    pub account: String,
    pub amount: f64,
    pub memo: String,
}

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<LedgerEntry>,
    next_id: u64,
}

/// Shared handle to the ledger. Clones see the same entries.
#[derive(Debug, Clone)]
pub struct Ledger {
    state: Arc<Mutex<LedgerState>>,
    payment_limit: f64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(DEFAULT_PAYMENT_LIMIT)
    }
}

impl Ledger {
    pub fn new(payment_limit: f64) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState::default())),
            payment_limit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.lock().entries.clone()
    }

    pub fn balance(&self) -> f64 {
        self.lock().entries.iter().map(|e| e.amount).sum()
    }

    fn append(&self, kind: &'static str, account: &str, amount: f64, memo: &str) -> u64 {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push(LedgerEntry {
            id,
            kind,
            account: account.to_string(),
            amount,
            memo: memo.to_string(),
        });
        id
    }

    fn remove(&self, id: u64) -> bool {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|e| e.id != id);
        state.entries.len() != before
    }
}

fn str_arg<'a>(tool: &str, args: &'a Args, key: &str) -> AgentResult<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("'{key}' must be a string"),
        })
}

fn amount_arg(tool: &str, args: &Args) -> AgentResult<f64> {
    args.get("amount")
        .and_then(Value::as_f64)
        .filter(|a| *a > 0.0)
        .ok_or_else(|| AgentError::InvalidArguments {
            tool: tool.to_string(),
            reason: "'amount' must be a positive number".to_string(),
        })
}

/// Reverse function shared by both operations.
fn remove_entry(ledger: Ledger) -> impl Fn(&ReversalRecord) -> AgentResult<Value> + Send + Sync {
    move |record: &ReversalRecord| {
        let id = record.result["entry_id"]
            .as_u64()
            .ok_or_else(|| AgentError::Rollback {
                action: record.action_name.clone(),
                reason: "execution result carries no entry_id".to_string(),
            })?;
        if !ledger.remove(id) {
            return Err(AgentError::Rollback {
                action: record.action_name.clone(),
                reason: format!("ledger entry {id} no longer exists"),
            });
        }
        Ok(json!({ "removed_entry": id }))
    }
}

/// Record an expense against an account.
pub fn post_entry(ledger: &Ledger) -> ReversibleAction {
    let target = ledger.clone();
    ReversibleAction::new(
        "post_entry",
        "Post an expense to a ledger account (account, amount, memo).",
        move |args: &Args| {
            let account = str_arg("post_entry", args, "account")?;
            let amount = amount_arg("post_entry", args)?;
            let memo = args.get("memo").and_then(Value::as_str).unwrap_or("");
            let id = target.append("expense", account, amount, memo);
            Ok(json!({ "entry_id": id }))
        },
        remove_entry(ledger.clone()),
    )
}

/// Pay a vendor. Payments above the ledger's limit are refused.
pub fn pay_vendor(ledger: &Ledger) -> ReversibleAction {
    let target = ledger.clone();
    ReversibleAction::new(
        "pay_vendor",
        "Pay a vendor from the operating account (vendor, amount).",
        move |args: &Args| {
            let vendor = str_arg("pay_vendor", args, "vendor")?;
            let amount = amount_arg("pay_vendor", args)?;
            if amount > target.payment_limit {
                return Err(AgentError::ToolExecution {
                    tool: "pay_vendor".to_string(),
                    reason: format!(
                        "payment of {amount:.2} exceeds the {:.2} limit",
                        target.payment_limit
                    ),
                });
            }
            let id = target.append("payment", vendor, -amount, "vendor payment");
            Ok(json!({ "entry_id": id }))
        },
        remove_entry(ledger.clone()),
    )
}

/// Both ledger operations, ready for the staging tools.
pub fn ledger_catalog(ledger: &Ledger) -> AgentResult<ReversibleCatalog> {
    let mut catalog = ReversibleCatalog::new();
    catalog.register(post_entry(ledger))?;
    catalog.register(pay_vendor(ledger))?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use agentry_txn::ActionTransaction;

    use super::*;

    fn args(value: Value) -> Args {
        match value {
            Value::Object(map) => map,
            _ => Args::new(),
        }
    }

    #[test]
    fn post_and_undo() {
        let ledger = Ledger::default();
        let post = post_entry(&ledger);
        post.run(&args(json!({ "account": "rent", "amount": 1200.0 })))
            .unwrap();
        assert_eq!(ledger.entries().len(), 1);

        post.undo().unwrap();
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn payment_over_limit_is_refused() {
        let ledger = Ledger::new(500.0);
        let err = pay_vendor(&ledger)
            .run(&args(json!({ "vendor": "Northgate", "amount": 900.0 })))
            .unwrap_err();
        assert!(matches!(err, AgentError::ToolExecution { .. }));
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn double_undo_reports_missing_entry() {
        let ledger = Ledger::default();
        let post = post_entry(&ledger);
        post.run(&args(json!({ "account": "rent", "amount": 10.0 })))
            .unwrap();
        post.undo().unwrap();
        assert!(matches!(post.undo(), Err(AgentError::Rollback { .. })));
    }

    #[test]
    fn failed_batch_leaves_ledger_untouched() {
        let ledger = Ledger::new(1_000.0);
        let catalog = ledger_catalog(&ledger).unwrap();

        let mut txn = ActionTransaction::new();
        txn.add(
            catalog.get("post_entry").unwrap(),
            args(json!({ "account": "freight", "amount": 450.0 })),
        )
        .unwrap();
        txn.add(
            catalog.get("pay_vendor").unwrap(),
            args(json!({ "vendor": "Northgate", "amount": 9_000.0 })),
        )
        .unwrap();

        assert!(matches!(txn.execute(), Err(AgentError::TransactionFailure { .. })));
        assert!(ledger.entries().is_empty());
        assert_eq!(ledger.balance(), 0.0);
    }

    #[test]
    fn repeated_postings_are_all_rolled_back() {
        let ledger = Ledger::default();
        let catalog = ledger_catalog(&ledger).unwrap();

        let mut txn = ActionTransaction::new();
        txn.add(
            catalog.get("post_entry").unwrap(),
            args(json!({ "account": "rent", "amount": 100.0 })),
        )
        .unwrap();
        txn.add(
            catalog.get("post_entry").unwrap(),
            args(json!({ "account": "freight", "amount": 200.0 })),
        )
        .unwrap();
        txn.add(
            catalog.get("pay_vendor").unwrap(),
            args(json!({ "vendor": "Northgate", "amount": 9_000.0 })),
        )
        .unwrap();

        assert!(matches!(txn.execute(), Err(AgentError::TransactionFailure { .. })));
        assert!(ledger.entries().is_empty(), "left behind: {:?}", ledger.entries());
    }
}

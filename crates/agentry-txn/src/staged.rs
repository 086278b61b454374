//! Staging area for transactions awaiting review.
//!
//! A staged transaction goes through:
//!
//! 1. `create_transaction`: a new, empty transaction is registered.
//! 2. `stage_action`: actions are queued. Nothing runs.
//! 3. `review_transaction`: a read-only description of the queue.
//! 4. Either `approve_and_execute` (execute, then commit) or
//!    `reject_transaction` (never executes).
//!
//! Each transaction sits behind its own lock. The map lock is held only to
//! look a transaction up, so staging or reviewing one transaction never waits
//! on another that is executing. Calls on the transaction being executed wait
//! for the execution to finish.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use agentry_contracts::{
    error::{AgentError, AgentResult},
    execution::TransactionId,
    invocation::Args,
};

use crate::{
    reversible::ReversibleAction,
    transaction::{ActionTransaction, TransactionOutcome, TransactionStatus, TransactionSummary},
};

/// Questions a reviewer is asked about every staged step.
pub const SAFETY_QUESTIONS: [&str; 5] = [
    "Is this action necessary?",
    "Could this have unintended consequences?",
    "Is the order correct?",
    "Are arguments valid?",
    "Does user have permission?",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewStep {
    /// 1-based position in the queue.
    pub step: usize,
    pub action: String,
    pub description: String,
    pub arguments: Args,
    pub safety_questions: Vec<String>,
}

/// The read-only view handed to a reviewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionReview {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub action_count: usize,
    pub steps: Vec<ReviewStep>,
}

type SharedTransaction = Arc<Mutex<ActionTransaction>>;

/// Holds staged transactions by id.
#[derive(Debug, Default)]
pub struct StagedActionEnvironment {
    transactions: Mutex<HashMap<TransactionId, SharedTransaction>>,
}

impl StagedActionEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TransactionId, SharedTransaction>> {
        self.transactions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn not_found(id: &TransactionId) -> AgentError {
        AgentError::TransactionNotFound {
            transaction_id: id.to_string(),
        }
    }

    /// Run `f` against the transaction with `id`.
    fn with_transaction<T>(
        &self,
        id: &TransactionId,
        f: impl FnOnce(&mut ActionTransaction) -> AgentResult<T>,
    ) -> AgentResult<T> {
        let shared = self.lock().get(id).cloned().ok_or_else(|| Self::not_found(id))?;
        let mut txn = shared.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut txn)
    }

    pub fn create_transaction(&self) -> TransactionId {
        let txn = ActionTransaction::new();
        let id = txn.id().clone();
        info!(transaction_id = %id, "staged transaction created");
        self.lock().insert(id.clone(), Arc::new(Mutex::new(txn)));
        id
    }

    pub fn contains(&self, id: &TransactionId) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stage_action(
        &self,
        id: &TransactionId,
        action: Arc<ReversibleAction>,
        args: Args,
    ) -> AgentResult<()> {
        self.with_transaction(id, |txn| txn.add(action, args))
    }

    /// Describe every queued step without running any of them.
    pub fn review_transaction(&self, id: &TransactionId) -> AgentResult<TransactionReview> {
        self.with_transaction(id, |txn| {
            let steps: Vec<ReviewStep> = txn
                .queued()
                .iter()
                .enumerate()
                .map(|(i, q)| ReviewStep {
                    step: i + 1,
                    action: q.action.name().to_string(),
                    description: q.action.description().to_string(),
                    arguments: q.args.clone(),
                    safety_questions: SAFETY_QUESTIONS.iter().map(|s| s.to_string()).collect(),
                })
                .collect();
            Ok(TransactionReview {
                transaction_id: id.to_string(),
                status: txn.status(),
                action_count: steps.len(),
                steps,
            })
        })
    }

    /// Execute the staged transaction, then commit it.
    ///
    /// Only this transaction's lock is held while actions run; it stays
    /// visible in the staging map throughout. A failed execution leaves the
    /// transaction rolled back and uncommitted.
    pub fn approve_and_execute(&self, id: &TransactionId) -> AgentResult<TransactionOutcome> {
        self.with_transaction(id, |txn| {
            if txn.is_committed() {
                return Err(AgentError::TransactionCommitted {
                    transaction_id: id.to_string(),
                });
            }
            let outcome = txn.execute()?;
            txn.commit();
            Ok(outcome)
        })
    }

    /// Mark the transaction rejected without executing it.
    pub fn reject_transaction(&self, id: &TransactionId) -> AgentResult<Value> {
        self.with_transaction(id, |txn| {
            if txn.is_committed() {
                return Err(AgentError::TransactionCommitted {
                    transaction_id: id.to_string(),
                });
            }
            txn.reject();
            Ok(json!({
                "status": "rejected",
                "transaction_id": id.to_string(),
                "message": format!(
                    "Staged transaction with {} actions was rejected",
                    txn.queued().len()
                ),
            }))
        })
    }

    pub fn summary(&self, id: &TransactionId) -> AgentResult<TransactionSummary> {
        self.with_transaction(id, |txn| Ok(txn.summary()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc,
    };
    use std::thread;

    use crate::reversible::ReversalRecord;

    use super::*;

    fn counted(name: &str, runs: Arc<AtomicUsize>) -> Arc<ReversibleAction> {
        Arc::new(ReversibleAction::new(
            name,
            "counts runs",
            move |_: &Args| {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(json!("ok"))
            },
            |_: &ReversalRecord| Ok(Value::Null),
        ))
    }

    fn args(key: &str, value: Value) -> Args {
        let mut a = Args::new();
        a.insert(key.to_string(), value);
        a
    }

    #[test]
    fn review_does_not_execute() {
        let runs = Arc::new(AtomicUsize::new(0));
        let env = StagedActionEnvironment::new();
        let id = env.create_transaction();
        env.stage_action(&id, counted("post_entry", runs.clone()), args("amount", json!(10)))
            .unwrap();
        env.stage_action(&id, counted("notify", runs.clone()), Args::new())
            .unwrap();

        let review = env.review_transaction(&id).unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(review.action_count, 2);
        assert_eq!(review.steps[0].step, 1);
        assert_eq!(review.steps[0].action, "post_entry");
        assert_eq!(review.steps[0].arguments["amount"], json!(10));
        assert_eq!(review.steps[1].safety_questions.len(), SAFETY_QUESTIONS.len());
        assert_eq!(review.status, TransactionStatus::Pending);
    }

    #[test]
    fn approve_executes_then_commits() {
        let runs = Arc::new(AtomicUsize::new(0));
        let env = StagedActionEnvironment::new();
        let id = env.create_transaction();
        env.stage_action(&id, counted("a", runs.clone()), Args::new())
            .unwrap();

        let outcome = env.approve_and_execute(&id).unwrap();
        assert_eq!(outcome.actions_executed, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(env.summary(&id).unwrap().status, TransactionStatus::Committed);

        let err = env
            .stage_action(&id, counted("b", runs.clone()), Args::new())
            .unwrap_err();
        assert!(matches!(err, AgentError::TransactionCommitted { .. }));

        // A second approval must not run the queue again.
        assert!(matches!(
            env.approve_and_execute(&id),
            Err(AgentError::TransactionCommitted { .. })
        ));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reject_never_executes() {
        let runs = Arc::new(AtomicUsize::new(0));
        let env = StagedActionEnvironment::new();
        let id = env.create_transaction();
        env.stage_action(&id, counted("a", runs.clone()), Args::new())
            .unwrap();
        env.stage_action(&id, counted("b", runs.clone()), Args::new())
            .unwrap();

        let notice = env.reject_transaction(&id).unwrap();
        assert_eq!(notice["status"], json!("rejected"));
        assert_eq!(
            notice["message"],
            json!("Staged transaction with 2 actions was rejected")
        );

        assert!(matches!(
            env.approve_and_execute(&id),
            Err(AgentError::TransactionRejected { .. })
        ));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(env.contains(&id));
    }

    #[test]
    fn unknown_transaction_is_not_found() {
        let env = StagedActionEnvironment::new();
        let missing = TransactionId::new();
        assert!(matches!(
            env.review_transaction(&missing),
            Err(AgentError::TransactionNotFound { .. })
        ));
        assert!(matches!(
            env.approve_and_execute(&missing),
            Err(AgentError::TransactionNotFound { .. })
        ));
        assert!(env.is_empty());
    }

    #[test]
    fn executing_transaction_stays_visible_and_others_proceed() {
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let slow = Arc::new(ReversibleAction::new(
            "slow",
            "waits until released",
            move |_: &Args| {
                let _ = started_tx.send(());
                let _ = release_rx.lock().unwrap().recv();
                Ok(json!("done"))
            },
            |_: &ReversalRecord| Ok(Value::Null),
        ));

        let env = Arc::new(StagedActionEnvironment::new());
        let busy = env.create_transaction();
        env.stage_action(&busy, slow, Args::new()).unwrap();
        let other = env.create_transaction();

        let worker = {
            let env = env.clone();
            let busy = busy.clone();
            thread::spawn(move || env.approve_and_execute(&busy))
        };
        started_rx.recv().unwrap();

        assert!(env.contains(&busy));
        let runs = Arc::new(AtomicUsize::new(0));
        env.stage_action(&other, counted("a", runs), Args::new())
            .unwrap();
        assert_eq!(env.review_transaction(&other).unwrap().action_count, 1);

        release_tx.send(()).unwrap();
        assert_eq!(worker.join().unwrap().unwrap().actions_executed, 1);
        assert_eq!(env.summary(&busy).unwrap().status, TransactionStatus::Committed);
    }
}

//! Atomic execution of a queue of reversible actions.
//!
//! ## Ordering
//!
//! Actions run strictly in queue order, one at a time. `executed` is always a
//! prefix of the queue. On the first failure the prefix is undone in reverse
//! order and the failing action is neither recorded nor undone.
//!
//! Each executed step keeps its own `ReversalRecord`, so an action queued
//! twice is undone once per run, newest first.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use agentry_contracts::{
    error::{AgentError, AgentResult},
    execution::TransactionId,
    invocation::Args,
};

use crate::reversible::{ReversalRecord, ReversibleAction};

// ── Status and reports ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Committed,
    RolledBack,
    Rejected,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Committed => "committed",
            TransactionStatus::RolledBack => "rolled_back",
            TransactionStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Returned by a fully successful `execute()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionOutcome {
    pub transaction_id: String,
    pub actions_executed: usize,
    /// One result per queued action, in queue order.
    pub results: Vec<Value>,
}

/// What `rollback()` managed to undo.
///
/// Failures do not stop the rollback; they are collected here instead.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Names of the actions undone, in the order they were undone.
    pub undone: Vec<String>,
    pub failures: Vec<AgentError>,
}

impl RollbackReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionSummary {
    pub transaction_id: String,
    pub status: TransactionStatus,
    pub actions_queued: usize,
    pub actions_executed: usize,
    pub created_at: DateTime<Utc>,
    pub action_names: Vec<String>,
}

/// One queued step.
#[derive(Debug, Clone)]
pub struct QueuedAction {
    pub action: Arc<ReversibleAction>,
    pub args: Args,
}

/// One step that ran successfully, with the record needed to reverse it.
#[derive(Debug, Clone)]
pub struct ExecutedStep {
    pub action: Arc<ReversibleAction>,
    pub record: ReversalRecord,
}

// ── Transaction ───────────────────────────────────────────────────────────────

/// A group of reversible actions executed as a unit.
#[derive(Debug)]
pub struct ActionTransaction {
    id: TransactionId,
    queued: Vec<QueuedAction>,
    executed: Vec<ExecutedStep>,
    committed: bool,
    status: TransactionStatus,
    created_at: DateTime<Utc>,
}

impl ActionTransaction {
    pub fn new() -> Self {
        Self {
            id: TransactionId::new(),
            queued: Vec::new(),
            executed: Vec::new(),
            committed: false,
            status: TransactionStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn queued(&self) -> &[QueuedAction] {
        &self.queued
    }

    /// Actions that have run successfully and not yet been rolled back.
    pub fn executed(&self) -> &[ExecutedStep] {
        &self.executed
    }

    /// Queue `action` with `args`.
    ///
    /// Fails once the transaction is committed or rejected.
    pub fn add(&mut self, action: Arc<ReversibleAction>, args: Args) -> AgentResult<()> {
        if self.committed {
            return Err(AgentError::TransactionCommitted {
                transaction_id: self.id.to_string(),
            });
        }
        if self.status == TransactionStatus::Rejected {
            return Err(AgentError::TransactionRejected {
                transaction_id: self.id.to_string(),
            });
        }
        info!(transaction_id = %self.id, action = %action.name(), "action queued");
        self.queued.push(QueuedAction { action, args });
        Ok(())
    }

    /// Run every queued action in order.
    ///
    /// On the first failure everything that already ran is rolled back and
    /// `AgentError::TransactionFailure` is returned, wrapping the original
    /// error.
    ///
    /// Refused with `AgentError::TransactionExecuted` while actions from an
    /// earlier run are still applied; `rollback()` first to run it again.
    pub fn execute(&mut self) -> AgentResult<TransactionOutcome> {
        if self.status == TransactionStatus::Rejected {
            return Err(AgentError::TransactionRejected {
                transaction_id: self.id.to_string(),
            });
        }
        if !self.executed.is_empty() {
            return Err(AgentError::TransactionExecuted {
                transaction_id: self.id.to_string(),
            });
        }

        info!(transaction_id = %self.id, actions = self.queued.len(), "executing transaction");

        let queued = self.queued.clone();
        let mut results = Vec::with_capacity(queued.len());
        for step in &queued {
            match step.action.run_recorded(&step.args) {
                Ok(record) => {
                    results.push(record.result.clone());
                    self.executed.push(ExecutedStep {
                        action: step.action.clone(),
                        record,
                    });
                }
                Err(source) => {
                    let action = step.action.name().to_string();
                    warn!(
                        transaction_id = %self.id,
                        action = %action,
                        error = %source,
                        "transaction step failed, rolling back"
                    );
                    let report = self.rollback();
                    if !report.is_clean() {
                        warn!(
                            transaction_id = %self.id,
                            failures = report.failures.len(),
                            "rollback was incomplete"
                        );
                    }
                    return Err(AgentError::TransactionFailure {
                        transaction_id: self.id.to_string(),
                        action,
                        source: Box::new(source),
                    });
                }
            }
        }

        info!(transaction_id = %self.id, "all transaction steps succeeded");
        Ok(TransactionOutcome {
            transaction_id: self.id.to_string(),
            actions_executed: results.len(),
            results,
        })
    }

    /// Undo every executed action, last first.
    ///
    /// Best effort: an undo failure is logged and recorded, and the remaining
    /// actions are still undone. `executed` is empty afterwards.
    pub fn rollback(&mut self) -> RollbackReport {
        info!(transaction_id = %self.id, actions = self.executed.len(), "rolling back");
        let mut report = RollbackReport::default();

        for step in self.executed.drain(..).rev() {
            let name = step.action.name().to_string();
            match step.action.reverse_record(&step.record) {
                Ok(_) => report.undone.push(name),
                Err(e) => {
                    warn!(
                        transaction_id = %self.id,
                        action = %name,
                        execution_id = %step.record.execution_id,
                        error = %e,
                        "undo failed during rollback"
                    );
                    report.failures.push(AgentError::Rollback {
                        action: name,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if !self.committed {
            self.status = TransactionStatus::RolledBack;
        }
        report
    }

    /// Block further queuing. Already executed actions are unaffected.
    pub fn commit(&mut self) {
        self.committed = true;
        self.status = TransactionStatus::Committed;
        info!(transaction_id = %self.id, "transaction committed");
    }

    /// Mark the transaction rejected. It will never execute.
    pub fn reject(&mut self) {
        self.status = TransactionStatus::Rejected;
        info!(transaction_id = %self.id, "transaction rejected");
    }

    pub fn summary(&self) -> TransactionSummary {
        TransactionSummary {
            transaction_id: self.id.to_string(),
            status: self.status,
            actions_queued: self.queued.len(),
            actions_executed: self.executed.len(),
            created_at: self.created_at,
            action_names: self
                .queued
                .iter()
                .map(|q| q.action.name().to_string())
                .collect(),
        }
    }
}

impl Default for ActionTransaction {
    fn default() -> Self {
        Self::new()
    }
}

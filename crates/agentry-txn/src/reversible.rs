//! Undoable single actions.

use std::{fmt, sync::Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use agentry_contracts::{
    error::{AgentError, AgentResult},
    execution::ExecutionId,
    invocation::Args,
};

/// What a reverse function needs to know about the run it undoes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReversalRecord {
    pub action_name: String,
    pub execution_id: ExecutionId,
    pub timestamp: DateTime<Utc>,
    pub args: Args,
    pub result: Value,
}

type ExecuteFn = dyn Fn(&Args) -> AgentResult<Value> + Send + Sync;
type ReverseFn = dyn Fn(&ReversalRecord) -> AgentResult<Value> + Send + Sync;

/// An action that records how to reverse its most recent run.
///
/// Only one run is remembered. A second successful `run` overwrites the
/// record, so `undo` always reverses the latest execution. A failed run
/// leaves the previous record in place.
pub struct ReversibleAction {
    name: String,
    description: String,
    execute: Box<ExecuteFn>,
    reverse: Box<ReverseFn>,
    last_record: Mutex<Option<ReversalRecord>>,
}

impl ReversibleAction {
    pub fn new<E, R>(name: impl Into<String>, description: impl Into<String>, execute: E, reverse: R) -> Self
    where
        E: Fn(&Args) -> AgentResult<Value> + Send + Sync + 'static,
        R: Fn(&ReversalRecord) -> AgentResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            execute: Box::new(execute),
            reverse: Box::new(reverse),
            last_record: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// The record of the most recent successful run, if any.
    pub fn last_record(&self) -> Option<ReversalRecord> {
        self.last_record
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Execute the action and remember how to reverse it.
    pub fn run(&self, args: &Args) -> AgentResult<Value> {
        self.run_recorded(args).map(|record| record.result)
    }

    /// Like `run`, but also hands back the record of this execution.
    ///
    /// Callers that queue the same action more than once keep these records
    /// themselves and reverse each one with `reverse_record`.
    pub fn run_recorded(&self, args: &Args) -> AgentResult<ReversalRecord> {
        let execution_id = ExecutionId::new();
        let result = (self.execute)(args)?;

        debug!(action = %self.name, execution_id = %execution_id, "reversible action executed");
        let record = ReversalRecord {
            action_name: self.name.clone(),
            execution_id,
            timestamp: Utc::now(),
            args: args.clone(),
            result,
        };
        *self.last_record.lock().unwrap_or_else(|e| e.into_inner()) = Some(record.clone());
        Ok(record)
    }

    /// Reverse the most recent successful run.
    ///
    /// The record is kept, so undoing twice calls the reverse function twice.
    pub fn undo(&self) -> AgentResult<Value> {
        let record = self.last_record().ok_or_else(|| AgentError::NoExecutionRecord {
            action: self.name.clone(),
        })?;
        self.reverse_record(&record)
    }

    /// Reverse one specific execution of this action.
    pub fn reverse_record(&self, record: &ReversalRecord) -> AgentResult<Value> {
        let result = (self.reverse)(record)?;
        debug!(action = %self.name, execution_id = %record.execution_id, "reversible action undone");
        Ok(result)
    }
}

impl fmt::Debug for ReversibleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReversibleAction")
            .field("name", &self.name)
            .field("has_record", &self.last_record().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    fn args(n: i64) -> Args {
        let mut a = Args::new();
        a.insert("amount".to_string(), json!(n));
        a
    }

    /// Adds `amount` to a shared balance; reversing subtracts it again.
    fn counter(balance: Arc<Mutex<i64>>) -> ReversibleAction {
        let up = balance.clone();
        ReversibleAction::new(
            "deposit",
            "add to balance",
            move |args| {
                let n = args["amount"].as_i64().unwrap_or(0);
                let mut b = up.lock().unwrap();
                *b += n;
                Ok(json!(*b))
            },
            move |record| {
                let n = record.args["amount"].as_i64().unwrap_or(0);
                let mut b = balance.lock().unwrap();
                *b -= n;
                Ok(json!(*b))
            },
        )
    }

    #[test]
    fn undo_before_run_fails() {
        let action = counter(Arc::new(Mutex::new(0)));
        match action.undo() {
            Err(AgentError::NoExecutionRecord { action }) => assert_eq!(action, "deposit"),
            other => panic!("expected NoExecutionRecord, got {:?}", other),
        }
    }

    #[test]
    fn run_records_and_undo_reverses() {
        let balance = Arc::new(Mutex::new(0));
        let action = counter(balance.clone());

        assert_eq!(action.run(&args(5)).unwrap(), json!(5));
        let record = action.last_record().unwrap();
        assert_eq!(record.action_name, "deposit");
        assert_eq!(record.result, json!(5));

        action.undo().unwrap();
        assert_eq!(*balance.lock().unwrap(), 0);
    }

    #[test]
    fn second_run_overwrites_record() {
        let balance = Arc::new(Mutex::new(0));
        let action = counter(balance.clone());

        action.run(&args(5)).unwrap();
        let first = action.last_record().unwrap().execution_id;
        action.run(&args(7)).unwrap();
        assert_ne!(action.last_record().unwrap().execution_id, first);

        // Only the latest run is reversed.
        action.undo().unwrap();
        assert_eq!(*balance.lock().unwrap(), 5);
    }

    #[test]
    fn failed_run_keeps_previous_record() {
        let action = ReversibleAction::new(
            "flaky",
            "",
            |args: &Args| {
                if args.contains_key("fail") {
                    Err(AgentError::ToolExecution {
                        tool: "flaky".to_string(),
                        reason: "boom".to_string(),
                    })
                } else {
                    Ok(json!("ok"))
                }
            },
            |_: &ReversalRecord| Ok(Value::Null),
        );

        action.run(&Args::new()).unwrap();
        let before = action.last_record().unwrap().execution_id;

        let mut failing = Args::new();
        failing.insert("fail".to_string(), json!(true));
        assert!(action.run(&failing).is_err());
        assert_eq!(action.last_record().unwrap().execution_id, before);
    }

    #[test]
    fn earlier_records_stay_reversible() {
        let balance = Arc::new(Mutex::new(0));
        let action = counter(balance.clone());

        let first = action.run_recorded(&args(5)).unwrap();
        action.run_recorded(&args(7)).unwrap();
        assert_eq!(*balance.lock().unwrap(), 12);

        action.reverse_record(&first).unwrap();
        assert_eq!(*balance.lock().unwrap(), 7);
    }
}

//! Staging exposed to an agent as ordinary actions.
//!
//! The agent never receives a `ReversibleAction` directly. It names entries
//! from a `ReversibleCatalog` when staging, and the transaction tools below
//! drive a shared `StagedActionEnvironment`:
//!
//! | Tool                  | Arguments                                   |
//! |-----------------------|---------------------------------------------|
//! | `begin_transaction`   | none                                        |
//! | `stage_action`        | `transaction_id`, `action`, optional `args` |
//! | `review_transaction`  | `transaction_id`                            |
//! | `commit_transaction`  | `transaction_id`                            |
//! | `reject_transaction`  | `transaction_id`                            |

use std::{collections::BTreeMap, sync::Arc};

use serde_json::{json, Value};

use agentry_contracts::{
    error::{AgentError, AgentResult},
    execution::TransactionId,
    invocation::Args,
};
use agentry_core::Action;

use crate::{reversible::ReversibleAction, staged::StagedActionEnvironment};

/// Tag carried by every staging tool.
pub const TRANSACTIONS_TAG: &str = "transactions";

/// Named reversible actions the agent may stage.
#[derive(Debug, Default)]
pub struct ReversibleCatalog {
    actions: BTreeMap<String, Arc<ReversibleAction>>,
}

impl ReversibleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: ReversibleAction) -> AgentResult<Arc<ReversibleAction>> {
        if self.actions.contains_key(action.name()) {
            return Err(AgentError::DuplicateName {
                name: action.name().to_string(),
            });
        }
        let action = Arc::new(action);
        self.actions.insert(action.name().to_string(), action.clone());
        Ok(action)
    }

    pub fn get(&self, name: &str) -> AgentResult<Arc<ReversibleAction>> {
        self.actions.get(name).cloned().ok_or_else(|| AgentError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

fn transaction_id(tool: &str, args: &Args) -> AgentResult<TransactionId> {
    let raw = args
        .get("transaction_id")
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::InvalidArguments {
            tool: tool.to_string(),
            reason: "'transaction_id' must be a string".to_string(),
        })?;
    TransactionId::parse(raw).ok_or_else(|| AgentError::TransactionNotFound {
        transaction_id: raw.to_string(),
    })
}

fn to_value<T: serde::Serialize>(tool: &str, value: &T) -> AgentResult<Value> {
    serde_json::to_value(value).map_err(|e| AgentError::ToolExecution {
        tool: tool.to_string(),
        reason: format!("cannot serialize result: {}", e),
    })
}

fn id_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "transaction_id": { "type": "string" } },
        "required": ["transaction_id"]
    })
}

/// Build the five staging tools over `env` and `catalog`.
pub fn staging_actions(
    env: Arc<StagedActionEnvironment>,
    catalog: Arc<ReversibleCatalog>,
) -> Vec<Action> {
    let begin = {
        let env = env.clone();
        Action::from_fn(
            "begin_transaction",
            "Start a new staged transaction and return its id.",
            move |_, _| Ok(json!({ "transaction_id": env.create_transaction().to_string() })),
        )
    };

    let stage = {
        let env = env.clone();
        let description = format!(
            "Queue a reversible action in a staged transaction. Nothing runs until the \
             transaction is committed. Available actions: {}.",
            catalog.names().join(", ")
        );
        Action::from_fn("stage_action", description, move |args, _| {
            let id = transaction_id("stage_action", args)?;
            let name = args.get("action").and_then(Value::as_str).ok_or_else(|| {
                AgentError::InvalidArguments {
                    tool: "stage_action".to_string(),
                    reason: "'action' must be a string".to_string(),
                }
            })?;
            let action = catalog.get(name)?;
            let action_args = match args.get("args") {
                Some(Value::Object(map)) => map.clone(),
                _ => Args::new(),
            };
            env.stage_action(&id, action, action_args)?;
            let queued = env.summary(&id)?.actions_queued;
            Ok(json!({
                "status": "staged",
                "transaction_id": id.to_string(),
                "action": name,
                "position": queued,
            }))
        })
        .with_parameters(json!({
            "type": "object",
            "properties": {
                "transaction_id": { "type": "string" },
                "action": { "type": "string" },
                "args": { "type": "object" }
            },
            "required": ["transaction_id", "action"]
        }))
    };

    let review = {
        let env = env.clone();
        Action::from_fn(
            "review_transaction",
            "Describe every staged step with safety questions. Does not execute anything.",
            move |args, _| {
                let id = transaction_id("review_transaction", args)?;
                to_value("review_transaction", &env.review_transaction(&id)?)
            },
        )
        .with_parameters(id_schema())
    };

    let commit = {
        let env = env.clone();
        Action::from_fn(
            "commit_transaction",
            "Execute all staged steps in order and commit. Rolls everything back if a step fails.",
            move |args, _| {
                let id = transaction_id("commit_transaction", args)?;
                to_value("commit_transaction", &env.approve_and_execute(&id)?)
            },
        )
        .with_parameters(id_schema())
    };

    let reject = Action::from_fn(
        "reject_transaction",
        "Discard a staged transaction without executing it.",
        move |args, _| {
            let id = transaction_id("reject_transaction", args)?;
            env.reject_transaction(&id)
        },
    )
    .with_parameters(id_schema());

    vec![begin, stage, review, commit, reject]
        .into_iter()
        .map(|a| a.with_tags([TRANSACTIONS_TAG]))
        .collect()
}

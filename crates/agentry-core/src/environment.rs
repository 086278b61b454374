//! The default in-process `Environment`.
//!
//! Execution runs in two phases:
//!
//! 1. **Validation**: `args` are checked against the action's parameter
//!    JSON Schema using the `jsonschema` crate. Violations short-circuit with
//!    an `invalid_arguments` record; the handler is never called.
//! 2. **Invocation**: the handler runs, receiving the shared
//!    `ActionContext` only when the action asked for it.
//!
//! Either way the caller receives an `ExecutionRecord`, never an error.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use agentry_contracts::{
    error::AgentError,
    execution::{ErrorKind, ExecutionRecord},
    invocation::Args,
};

use crate::{action::Action, context::ActionContext, traits::Environment};

/// Runs handlers in the calling thread.
pub struct LocalEnvironment {
    context: Arc<ActionContext>,
    validate_arguments: bool,
}

impl LocalEnvironment {
    pub fn new(context: Arc<ActionContext>) -> Self {
        Self {
            context,
            validate_arguments: true,
        }
    }

    /// Skip parameter-schema validation; handlers see raw model arguments.
    pub fn without_validation(mut self) -> Self {
        self.validate_arguments = false;
        self
    }

    pub fn context(&self) -> &Arc<ActionContext> {
        &self.context
    }
}

impl Environment for LocalEnvironment {
    fn execute_action(&self, action: &Action, args: &Args) -> ExecutionRecord {
        if self.validate_arguments {
            if let Err(reason) = validate_arguments(action.parameters(), args) {
                warn!(tool = %action.name(), %reason, "arguments rejected by parameter schema");
                return ExecutionRecord::failure(ErrorKind::InvalidArguments, reason);
            }
        }

        let context = action.needs_context().then(|| self.context.as_ref());

        debug!(
            tool = %action.name(),
            with_context = context.is_some(),
            "invoking action handler"
        );

        match action.execute(args, context) {
            Ok(value) => ExecutionRecord::success(value),
            Err(e) => {
                warn!(tool = %action.name(), error = %e, "action handler failed");
                let kind = match e {
                    AgentError::InvalidArguments { .. } => ErrorKind::InvalidArguments,
                    _ => ErrorKind::ToolError,
                };
                ExecutionRecord::failure(kind, e.to_string())
            }
        }
    }
}

/// Check `args` against `schema`, collecting every violation.
///
/// A null schema means "no constraint".
pub fn validate_arguments(schema: &Value, args: &Args) -> Result<(), String> {
    if schema.is_null() {
        return Ok(());
    }

    let validator = jsonschema::validator_for(schema)
        .map_err(|e| format!("invalid parameter schema: {e}"))?;

    let instance = Value::Object(args.clone());
    let violations: Vec<String> = validator
        .iter_errors(&instance)
        .map(|error| format!("{} at '{}'", error, error.instance_path))
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations.join("; "))
    }
}

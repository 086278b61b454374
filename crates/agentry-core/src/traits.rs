//! Capability traits at the seams of the agent loop.
//!
//! - `ModelClient`: the external text-generation collaborator
//! - `AgentLanguage`: renders state into a prompt, parses a reply back
//! - `Environment`: runs a resolved action and normalizes its outcome
//! - `ActionHandler`: the fixed contract every tool implements
//! - `Storage`: the persistent collection store handed to tools
//!
//! The agent owns one of each and never reaches past these interfaces.

use std::sync::Arc;

use serde_json::{Map, Value};

use agentry_contracts::{
    error::AgentResult,
    execution::ExecutionRecord,
    goal::Goal,
    invocation::{Args, Invocation},
    prompt::Prompt,
};

use crate::{action::Action, context::ActionContext, memory::Memory};

/// The model-calling collaborator.
///
/// Implementations return `AgentError::RateLimited` for throttling, which the
/// holder may retry, and `AgentError::ModelCall` for everything else.
pub trait ModelClient: Send + Sync {
    /// Produce a completion for `prompt`. Blocks until the reply is ready.
    fn call(&self, prompt: &Prompt) -> AgentResult<String>;
}

impl<M: ModelClient + ?Sized> ModelClient for Arc<M> {
    fn call(&self, prompt: &Prompt) -> AgentResult<String> {
        (**self).call(prompt)
    }
}

/// Prompt construction and response parsing.
///
/// Every implementation must hand back the same `Invocation` shape so the
/// agent loop stays agnostic of how the model expresses tool calls.
pub trait AgentLanguage: Send + Sync {
    /// Render goals, available actions and memory into an ordered prompt.
    fn construct_prompt(&self, actions: &[Arc<Action>], goals: &[Goal], memory: &Memory) -> Prompt;

    /// Extract the invocation from a raw model reply.
    ///
    /// Returns `AgentError::Parse` when no well-formed invocation is present.
    /// The loop turns that into an environment turn rather than aborting.
    fn parse_response(&self, response: &str) -> AgentResult<Invocation>;
}

/// Executes a resolved action.
///
/// Never fails: handler errors are captured into the returned record.
pub trait Environment: Send + Sync {
    fn execute_action(&self, action: &Action, args: &Args) -> ExecutionRecord;
}

/// The contract a tool handler implements.
///
/// `context` is `Some` only for actions registered with `requires_context`.
pub trait ActionHandler: Send + Sync {
    fn invoke(&self, args: &Args, context: Option<&ActionContext>) -> AgentResult<Value>;
}

/// Persistent, collection-oriented key/value storage.
///
/// Mutating calls persist before returning and surface save failures as
/// `AgentError::Storage`. There is no isolation between concurrent writers.
pub trait Storage: Send + Sync {
    /// Return a copy of the collection, empty if it does not exist.
    fn get_collection(&self, name: &str) -> AgentResult<Map<String, Value>>;

    fn set_in_collection(&self, name: &str, key: &str, value: Value) -> AgentResult<()>;

    fn get_from_collection(&self, name: &str, key: &str) -> AgentResult<Option<Value>>;

    /// Returns true if the key existed.
    fn delete_from_collection(&self, name: &str, key: &str) -> AgentResult<bool>;

    fn list_collection(&self, name: &str) -> AgentResult<Map<String, Value>> {
        self.get_collection(name)
    }

    fn clear_collection(&self, name: &str) -> AgentResult<()>;

    fn clear_all(&self) -> AgentResult<()>;
}

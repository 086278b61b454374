//! Actions and the registry the agent resolves tool names against.
//!
//! An `Action` pairs an `ActionHandler` with the metadata the model sees
//! (name, description, parameter schema) and the flags the loop reads
//! (`terminal`, `requires_context`). Once registered it is shared as
//! `Arc<Action>` and never mutated.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use agentry_contracts::{
    error::{AgentError, AgentResult},
    invocation::Args,
    prompt::ToolSpec,
};

use crate::{context::ActionContext, traits::ActionHandler};

/// Adapts a plain closure to `ActionHandler`.
struct FnHandler<F>(F);

impl<F> ActionHandler for FnHandler<F>
where
    F: Fn(&Args, Option<&ActionContext>) -> AgentResult<Value> + Send + Sync,
{
    fn invoke(&self, args: &Args, context: Option<&ActionContext>) -> AgentResult<Value> {
        (self.0)(args, context)
    }
}

/// A named, schema-described capability the agent may invoke.
pub struct Action {
    name: String,
    description: String,
    parameters: Value,
    handler: Box<dyn ActionHandler>,
    terminal: bool,
    requires_context: bool,
    tags: BTreeSet<String>,
}

impl Action {
    /// Wrap a handler. Parameters default to an empty object schema.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl ActionHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: json!({ "type": "object", "properties": {} }),
            handler: Box::new(handler),
            terminal: false,
            requires_context: false,
            tags: BTreeSet::new(),
        }
    }

    /// Wrap a closure as the handler.
    pub fn from_fn<F>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Args, Option<&ActionContext>) -> AgentResult<Value> + Send + Sync + 'static,
    {
        Self::new(name, description, FnHandler(f))
    }

    /// Set the JSON Schema describing the handler's named arguments.
    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameters = schema;
        self
    }

    /// Mark the action as ending the loop when it succeeds.
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Ask the environment to pass the run's `ActionContext` to the handler.
    pub fn requires_context(mut self) -> Self {
        self.requires_context = true;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn needs_context(&self) -> bool {
        self.requires_context
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_any_tag(&self, tags: &[&str]) -> bool {
        tags.iter().any(|t| self.tags.contains(*t))
    }

    /// Invoke the handler directly. Callers normally go through an `Environment`.
    pub fn execute(&self, args: &Args, context: Option<&ActionContext>) -> AgentResult<Value> {
        self.handler.invoke(args, context)
    }

    pub fn tool_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("terminal", &self.terminal)
            .field("requires_context", &self.requires_context)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Name-keyed action registry.
///
/// Listing order is registration order. A registry is an explicit value
/// built for one agent; there is no process-wide instance.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<Action>>,
    index: HashMap<String, usize>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action`, returning the shared handle.
    ///
    /// Fails with `DuplicateName` if the name is taken; the registry is left
    /// unchanged in that case.
    pub fn register(&mut self, action: Action) -> AgentResult<Arc<Action>> {
        self.register_shared(Arc::new(action))
    }

    pub fn register_shared(&mut self, action: Arc<Action>) -> AgentResult<Arc<Action>> {
        if self.index.contains_key(action.name()) {
            return Err(AgentError::DuplicateName {
                name: action.name().to_string(),
            });
        }
        self.index.insert(action.name().to_string(), self.actions.len());
        self.actions.push(Arc::clone(&action));
        Ok(action)
    }

    /// Look up an action by name. Fails with `NotFound` if absent.
    pub fn get(&self, name: &str) -> AgentResult<Arc<Action>> {
        self.index
            .get(name)
            .map(|&i| Arc::clone(&self.actions[i]))
            .ok_or_else(|| AgentError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Every action, in registration order.
    pub fn list(&self) -> Vec<Arc<Action>> {
        self.actions.clone()
    }

    /// Actions carrying at least one of `tags`; all actions when `tags` is empty.
    pub fn list_tagged(&self, tags: &[&str]) -> Vec<Arc<Action>> {
        if tags.is_empty() {
            return self.list();
        }
        self.actions
            .iter()
            .filter(|a| a.has_any_tag(tags))
            .cloned()
            .collect()
    }

    /// A new registry holding the tag-filtered view. Handles are shared.
    pub fn subset(&self, tags: &[&str]) -> ActionRegistry {
        let mut subset = ActionRegistry::new();
        for action in self.list_tagged(tags) {
            // Names are unique in `self`, so this cannot collide.
            let _ = subset.register_shared(action);
        }
        subset
    }

    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        self.actions.iter().map(|a| a.tool_spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

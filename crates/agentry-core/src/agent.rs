//! The agent control loop.
//!
//! Each iteration walks the same phases:
//!
//!   Building → AwaitingModel → Resolving → Executing → (Building | Done)
//!
//! A malformed reply or an unknown tool never aborts the run: the reply is
//! appended as an `assistant` turn and the problem as an `environment` turn,
//! so the model can correct itself on the next iteration. Only a fatal
//! model-call failure propagates out of `run`.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use agentry_contracts::{
    error::{AgentError, AgentResult},
    execution::{ErrorKind, ExecutionRecord},
    goal::Goal,
    invocation::Invocation,
    memory::MemoryEntry,
};

use crate::{
    action::{Action, ActionRegistry},
    context::ActionContext,
    environment::LocalEnvironment,
    memory::Memory,
    retry::{call_with_retry, RetryPolicy},
    traits::{AgentLanguage, Environment, ModelClient},
};

/// The phases of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Building,
    AwaitingModel,
    Resolving,
    Executing,
    Done,
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentPhase::Building => "building",
            AgentPhase::AwaitingModel => "awaiting_model",
            AgentPhase::Resolving => "resolving",
            AgentPhase::Executing => "executing",
            AgentPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Goals, language, registry, model and environment wired into one loop.
///
/// Build with [`Agent::builder`]. Wrap in an `Arc` via [`Agent::shared`] when
/// tools need to reach the agent through their `ActionContext`.
pub struct Agent {
    name: String,
    goals: Vec<Goal>,
    language: Box<dyn AgentLanguage>,
    registry: ActionRegistry,
    model: Arc<dyn ModelClient>,
    environment: Box<dyn Environment>,
    context: Arc<ActionContext>,
    retry: RetryPolicy,
}

impl Agent {
    pub fn builder(name: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(name)
    }

    /// Move into an `Arc` and bind the context's agent back-reference.
    pub fn shared(self) -> Arc<Agent> {
        let agent = Arc::new(self);
        agent.context.bind_agent(&agent);
        agent
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn context(&self) -> &Arc<ActionContext> {
        &self.context
    }

    /// Run until a terminal action succeeds. There is no iteration bound.
    pub fn run(&self, task: &str, memory: Option<Memory>) -> AgentResult<Memory> {
        self.drive(task, memory, None)
    }

    /// Run until a terminal action succeeds or `max_iterations` model turns
    /// have been taken, whichever comes first.
    pub fn run_bounded(
        &self,
        task: &str,
        memory: Option<Memory>,
        max_iterations: usize,
    ) -> AgentResult<Memory> {
        self.drive(task, memory, Some(max_iterations))
    }

    fn drive(
        &self,
        task: &str,
        memory: Option<Memory>,
        max_iterations: Option<usize>,
    ) -> AgentResult<Memory> {
        let memory = memory.unwrap_or_default();
        memory.append(MemoryEntry::user(task));
        self.context.set_memory(memory.clone());

        let actions = self.registry.list();

        info!(
            agent = %self.name,
            actions = actions.len(),
            goals = self.goals.len(),
            max_iterations = ?max_iterations,
            "agent run starting"
        );

        let mut iteration: usize = 0;
        loop {
            if let Some(limit) = max_iterations {
                if iteration >= limit {
                    warn!(
                        agent = %self.name,
                        iterations = iteration,
                        "iteration limit reached before a terminal action"
                    );
                    return Ok(memory);
                }
            }
            iteration += 1;

            // ── Building ─────────────────────────────────────────────────────
            debug!(agent = %self.name, iteration, phase = %AgentPhase::Building, "constructing prompt");
            let prompt = self.language.construct_prompt(&actions, &self.goals, &memory);

            // ── AwaitingModel ────────────────────────────────────────────────
            //
            // The only suspension point. A fatal error here ends the run.
            debug!(
                agent = %self.name,
                iteration,
                phase = %AgentPhase::AwaitingModel,
                messages = prompt.messages.len(),
                "calling model"
            );
            let response = call_with_retry(self.model.as_ref(), &prompt, &self.retry)?;

            // ── Resolving ────────────────────────────────────────────────────
            debug!(agent = %self.name, iteration, phase = %AgentPhase::Resolving, "resolving response");
            let (action, invocation) = match self.resolve(&response) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(agent = %self.name, iteration, error = %e, "response not actionable, feeding back");
                    memory.append(MemoryEntry::assistant(response));
                    memory.append(MemoryEntry::environment(feedback_for(&e).to_content()));
                    continue;
                }
            };

            // ── Executing ────────────────────────────────────────────────────
            debug!(
                agent = %self.name,
                iteration,
                phase = %AgentPhase::Executing,
                tool = %invocation.tool,
                "executing action"
            );
            let record = self.environment.execute_action(&action, &invocation.args);
            let succeeded = record.succeeded();

            memory.append(MemoryEntry::assistant(response));
            memory.append(MemoryEntry::environment(record.to_content()));

            if action.is_terminal() && succeeded {
                info!(
                    agent = %self.name,
                    iterations = iteration,
                    tool = %invocation.tool,
                    phase = %AgentPhase::Done,
                    "terminal action succeeded, run complete"
                );
                return Ok(memory);
            }
        }
    }

    /// Parse the reply and look up the named action.
    ///
    /// Fails with `Parse` or `UnknownTool`; both are recoverable.
    pub fn resolve(&self, response: &str) -> AgentResult<(Arc<Action>, Invocation)> {
        let invocation = self.language.parse_response(response)?;
        match self.registry.get(&invocation.tool) {
            Ok(action) => Ok((action, invocation)),
            Err(AgentError::NotFound { name }) => Err(AgentError::UnknownTool { tool: name }),
            Err(other) => Err(other),
        }
    }
}

/// The environment payload for a reply that could not be executed.
fn feedback_for(error: &AgentError) -> ExecutionRecord {
    let kind = match error {
        AgentError::UnknownTool { .. } | AgentError::NotFound { .. } => ErrorKind::UnknownTool,
        _ => ErrorKind::ParseError,
    };
    ExecutionRecord::failure(kind, error.to_string())
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("goals", &self.goals)
            .field("actions", &self.registry.names())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Step-by-step construction of an [`Agent`].
pub struct AgentBuilder {
    name: String,
    goals: Vec<Goal>,
    language: Option<Box<dyn AgentLanguage>>,
    registry: ActionRegistry,
    model: Option<Arc<dyn ModelClient>>,
    environment: Option<Box<dyn Environment>>,
    context: Option<Arc<ActionContext>>,
    retry: RetryPolicy,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            goals: Vec::new(),
            language: None,
            registry: ActionRegistry::new(),
            model: None,
            environment: None,
            context: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn goals(mut self, goals: Vec<Goal>) -> Self {
        self.goals = goals;
        self
    }

    pub fn goal(mut self, goal: Goal) -> Self {
        self.goals.push(goal);
        self
    }

    pub fn language(mut self, language: impl AgentLanguage + 'static) -> Self {
        self.language = Some(Box::new(language));
        self
    }

    pub fn registry(mut self, registry: ActionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn model(mut self, model: Arc<dyn ModelClient>) -> Self {
        self.model = Some(model);
        self
    }

    /// Replace the default `LocalEnvironment`.
    pub fn environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Some(Box::new(environment));
        self
    }

    pub fn context(mut self, context: Arc<ActionContext>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fails with `Config` if the language or the model is missing.
    pub fn build(self) -> AgentResult<Agent> {
        let language = self.language.ok_or_else(|| AgentError::Config {
            reason: format!("agent '{}' has no language", self.name),
        })?;
        let model = self.model.ok_or_else(|| AgentError::Config {
            reason: format!("agent '{}' has no model", self.name),
        })?;
        let context = self
            .context
            .unwrap_or_else(|| Arc::new(ActionContext::new()));

        // The run's own model doubles as the context's default tier.
        if context.default_model().is_none() {
            context.set_model(crate::context::DEFAULT_TIER, Arc::clone(&model));
        }

        let environment = self
            .environment
            .unwrap_or_else(|| Box::new(LocalEnvironment::new(Arc::clone(&context))));

        Ok(Agent {
            name: self.name,
            goals: self.goals,
            language,
            registry: self.registry,
            model,
            environment,
            context,
            retry: self.retry,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

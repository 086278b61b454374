//! Runtime error types for the agentry orchestration core.
//!
//! All fallible operations return `AgentResult<T>`. Variants carry enough
//! context to be rendered back to the model as an environment turn or to be
//! surfaced to the caller of a public entry point.

use thiserror::Error;

/// The unified error type for the agentry runtime.
#[derive(Debug, Error)]
pub enum AgentError {
    /// An action with the same name is already registered.
    #[error("action '{name}' is already registered")]
    DuplicateName { name: String },

    /// The requested action is not registered.
    #[error("action '{name}' is not registered")]
    NotFound { name: String },

    /// The model response did not contain a well-formed invocation.
    #[error("failed to parse model response: {reason}")]
    Parse { reason: String },

    /// The model named a tool the registry does not know.
    #[error("unknown tool '{tool}'")]
    UnknownTool { tool: String },

    /// A tool handler failed.
    #[error("tool '{tool}' failed: {reason}")]
    ToolExecution { tool: String, reason: String },

    /// The arguments did not satisfy the action's parameter schema.
    #[error("invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// A queued action failed; previously executed actions were rolled back.
    #[error("transaction {transaction_id} failed at '{action}': {source}")]
    TransactionFailure {
        transaction_id: String,
        action: String,
        #[source]
        source: Box<AgentError>,
    },

    /// An individual undo failed during rollback.
    #[error("rollback of '{action}' failed: {reason}")]
    Rollback { action: String, reason: String },

    /// `undo()` was called on an action that has never run successfully.
    #[error("cannot undo '{action}': no execution record")]
    NoExecutionRecord { action: String },

    /// The transaction is committed and no longer accepts actions.
    #[error("transaction {transaction_id} is already committed")]
    TransactionCommitted { transaction_id: String },

    /// The transaction was rejected during review and cannot execute.
    #[error("transaction {transaction_id} was rejected")]
    TransactionRejected { transaction_id: String },

    /// The transaction already holds executed actions that were neither
    /// committed nor rolled back.
    #[error("transaction {transaction_id} has already executed; roll back before executing again")]
    TransactionExecuted { transaction_id: String },

    /// No staged transaction exists with this id.
    #[error("transaction {transaction_id} not found")]
    TransactionNotFound { transaction_id: String },

    /// Loading or saving persistent storage failed.
    #[error("storage error: {reason}")]
    Storage { reason: String },

    /// The model collaborator signalled throttling. Retryable.
    #[error("model rate limited: {reason}")]
    RateLimited { reason: String },

    /// The model collaborator failed. Fatal to the run.
    #[error("model call failed: {reason}")]
    ModelCall { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl AgentError {
    /// True for the throttling class that callers may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::RateLimited { .. })
    }
}

/// Convenience alias used throughout the agentry crates.
pub type AgentResult<T> = Result<T, AgentError>;

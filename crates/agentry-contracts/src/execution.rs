//! Normalized tool execution records.
//!
//! Whatever a handler returns or fails with, the environment reduces it to an
//! `ExecutionRecord`. The agent serializes the record into the `environment`
//! memory entry, so the model sees successes and failures in one shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a turn did not execute a tool successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The response had no usable invocation block.
    ParseError,
    /// The invocation named a tool that is not registered.
    UnknownTool,
    /// The arguments failed the action's parameter schema.
    InvalidArguments,
    /// The handler itself failed.
    ToolError,
}

/// The structured outcome of one turn, as fed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub tool_executed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionRecord {
    /// A successful execution carrying the handler's value.
    pub fn success(result: Value) -> Self {
        Self {
            tool_executed: true,
            result: Some(result),
            error: None,
            error_kind: None,
            timestamp: Utc::now(),
        }
    }

    /// A turn that did not execute, or whose handler failed.
    pub fn failure(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            tool_executed: false,
            result: None,
            error: Some(error.into()),
            error_kind: Some(kind),
            timestamp: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.tool_executed && self.error.is_none()
    }

    /// Compact JSON used as the content of an `environment` memory entry.
    pub fn to_content(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"tool_executed":false,"error":"unserializable record: {e}"}}"#)
        })
    }
}

/// Unique identifier for one successful run of a reversible action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionId(pub uuid::Uuid);

impl ExecutionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub uuid::Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse the textual form produced by `Display`.
    pub fn parse(s: &str) -> Option<Self> {
        uuid::Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

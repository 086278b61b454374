//! Conversation log entry types.
//!
//! The log itself (`agentry_core::Memory`) is a shared, append-only handle;
//! this module only defines what one entry looks like.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Who produced a memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    User,
    Assistant,
    Environment,
    System,
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MemoryType::User => "user",
            MemoryType::Assistant => "assistant",
            MemoryType::Environment => "environment",
            MemoryType::System => "system",
        };
        f.write_str(s)
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    #[serde(rename = "type")]
    pub kind: MemoryType,
    pub content: String,
}

impl MemoryEntry {
    pub fn new(kind: MemoryType, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MemoryType::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MemoryType::Assistant, content)
    }

    pub fn environment(content: impl Into<String>) -> Self {
        Self::new(MemoryType::Environment, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MemoryType::System, content)
    }
}

//! The TOML sections of an agent configuration file.
//!
//! Example:
//! ```toml
//! [agent]
//! name = "invoice-agent"
//! max_iterations = 10
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 500
//! max_delay_ms = 8000
//!
//! [storage]
//! path = "agent_storage.json"
//!
//! [tools]
//! tags = ["invoices", "system"]
//!
//! [[goals]]
//! priority = 1
//! name = "Extract"
//! description = "Extract the invoice fields"
//! ```
//!
//! Only `[agent]` is required; every other section has defaults.

use serde::{Deserialize, Serialize};

use agentry_contracts::goal::Goal;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSection {
    pub name: String,
    /// Model turns before the run stops. Absent means unbounded.
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub path: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: "agent_storage.json".to_string(),
        }
    }
}

/// Tool selection. An empty tag list exposes every registered action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub tags: Vec<String>,
}

/// One `[[goals]]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalEntry {
    pub priority: i32,
    pub name: String,
    pub description: String,
}

impl From<&GoalEntry> for Goal {
    fn from(entry: &GoalEntry) -> Self {
        Goal::new(entry.priority, entry.name.clone(), entry.description.clone())
    }
}

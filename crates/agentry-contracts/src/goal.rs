//! Prioritized goals rendered into every prompt.

use serde::{Deserialize, Serialize};

/// A prioritized instruction that steers the agent.
///
/// Goals are fixed at agent construction. Lower `priority` values are more
/// important and render first when a caller sorts them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub priority: i32,
    pub name: String,
    pub description: String,
}

impl Goal {
    pub fn new(priority: i32, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            priority,
            name: name.into(),
            description: description.into(),
        }
    }
}

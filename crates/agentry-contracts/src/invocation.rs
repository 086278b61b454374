//! The `{tool, args}` wire shape every agent language must produce.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named arguments passed to a tool handler.
pub type Args = Map<String, Value>;

/// A parsed instruction to run one tool.
///
/// This is the only contract between an `AgentLanguage` and the agent loop:
/// every variant, text-marker or structured, hands back this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invocation {
    pub tool: String,
    #[serde(default)]
    pub args: Args,
}

impl Invocation {
    pub fn new(tool: impl Into<String>, args: Args) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }
}

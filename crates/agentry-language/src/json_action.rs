//! Marker-delimited JSON action language.
//!
//! The model replies with free-form reasoning followed by exactly one block:
//!
//! ````text
//! ```action
//! {"tool": "extract_invoice", "args": {"document": "..."}}
//! ```
//! ````
//!
//! Parsing takes the text between the opening marker and the nearest closing
//! fence after it. A missing marker or undecodable JSON is a parse error.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use agentry_contracts::{
    error::{AgentError, AgentResult},
    goal::Goal,
    invocation::Invocation,
    prompt::{Message, Prompt},
};
use agentry_core::{traits::AgentLanguage, Action, Memory};

use crate::render::{goals_block, memory_messages};

const FENCE: &str = "```";

/// Text-marker variant of `AgentLanguage`.
#[derive(Debug, Clone)]
pub struct JsonActionLanguage {
    marker: String,
}

impl JsonActionLanguage {
    pub fn new() -> Self {
        Self::with_marker("action")
    }

    /// Use a different literal after the opening fence.
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    fn opening(&self) -> String {
        format!("{FENCE}{}", self.marker)
    }

    /// Instructions appended to the system turn describing the reply format.
    pub fn format_instructions(&self) -> String {
        format!(
            "<Stop and think step by step. Insert your thoughts here.>\n\n\
             {open}\n\
             {{\n    \"tool\": \"tool_name\",\n    \"args\": {{...fill in arguments...}}\n}}\n\
             {FENCE}",
            open = self.opening()
        )
    }

    fn actions_block(&self, actions: &[Arc<Action>]) -> String {
        let described: Vec<_> = actions
            .iter()
            .map(|a| {
                json!({
                    "name": a.name(),
                    "description": a.description(),
                    "args": a.parameters(),
                })
            })
            .collect();
        let listing = serde_json::to_string_pretty(&described).unwrap_or_else(|_| "[]".to_string());
        format!("Available Tools: {listing}\n\n{}", self.format_instructions())
    }

    /// Slice out the block body. Without a closing fence, the rest of the reply is used.
    fn extract_block<'r>(&self, response: &'r str) -> AgentResult<&'r str> {
        let opening = self.opening();
        let start = response.find(&opening).ok_or_else(|| AgentError::Parse {
            reason: format!("no '{opening}' block found in response"),
        })?;
        let body = &response[start + opening.len()..];
        let end = body.find(FENCE).unwrap_or(body.len());
        Ok(body[..end].trim())
    }
}

impl Default for JsonActionLanguage {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentLanguage for JsonActionLanguage {
    /// One leading system turn (goals, then tools and format), then memory.
    fn construct_prompt(&self, actions: &[Arc<Action>], goals: &[Goal], memory: &Memory) -> Prompt {
        let mut system = goals_block(goals);
        if !system.is_empty() {
            system.push_str("\n\n");
        }
        system.push_str(&self.actions_block(actions));

        let mut messages = vec![Message::system(system)];
        messages.extend(memory_messages(memory));
        Prompt::new(messages)
    }

    fn parse_response(&self, response: &str) -> AgentResult<Invocation> {
        let block = self.extract_block(response)?;
        debug!(marker = %self.marker, bytes = block.len(), "extracted action block");
        serde_json::from_str(block).map_err(|e| AgentError::Parse {
            reason: format!("action block is not a valid invocation: {e}"),
        })
    }
}

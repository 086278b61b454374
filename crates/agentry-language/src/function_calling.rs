//! Structured tool-call language.
//!
//! The prompt carries the registry as `ToolSpec`s and the collaborator is
//! expected to use its native tool-calling feature, returning the call as a
//! JSON object. Parsing is field extraction, not text scanning. Two shapes
//! are accepted:
//!
//! - `{"tool": "...", "args": {...}}`
//! - `{"name": "...", "arguments": {...} | "<json string>"}`

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use agentry_contracts::{
    error::{AgentError, AgentResult},
    goal::Goal,
    invocation::{Args, Invocation},
    prompt::{Message, Prompt},
};
use agentry_core::{traits::AgentLanguage, Action, Memory};

use crate::render::{goals_block, memory_messages};

#[derive(Deserialize)]
#[serde(untagged)]
enum ToolCallWire {
    Invocation(Invocation),
    Native {
        name: String,
        #[serde(default)]
        arguments: Value,
    },
}

fn arguments_to_args(tool: &str, arguments: Value) -> AgentResult<Args> {
    match arguments {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        Value::String(encoded) if encoded.trim().is_empty() => Ok(Map::new()),
        Value::String(encoded) => match serde_json::from_str::<Value>(&encoded) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(AgentError::Parse {
                reason: format!("arguments for '{tool}' are not a JSON object"),
            }),
        },
        _ => Err(AgentError::Parse {
            reason: format!("arguments for '{tool}' are not a JSON object"),
        }),
    }
}

/// Native tool-call variant of `AgentLanguage`.
#[derive(Debug, Clone, Default)]
pub struct FunctionCallingLanguage {
    text_fallback: Option<String>,
}

impl FunctionCallingLanguage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map plain-text replies to `tool` with `{"message": <text>}`.
    ///
    /// Without a fallback, a reply that is not a tool call is a parse error.
    /// A reply that starts with `{` is always treated as an attempted call, so
    /// malformed JSON stays a parse error even with a fallback configured.
    pub fn with_text_fallback(mut self, tool: impl Into<String>) -> Self {
        self.text_fallback = Some(tool.into());
        self
    }
}

impl AgentLanguage for FunctionCallingLanguage {
    fn construct_prompt(&self, actions: &[Arc<Action>], goals: &[Goal], memory: &Memory) -> Prompt {
        let mut messages = Vec::new();
        let goals = goals_block(goals);
        if !goals.is_empty() {
            messages.push(Message::system(goals));
        }
        messages.extend(memory_messages(memory));

        Prompt::new(messages).with_tools(actions.iter().map(|a| a.tool_spec()).collect())
    }

    fn parse_response(&self, response: &str) -> AgentResult<Invocation> {
        let parsed = match serde_json::from_str::<ToolCallWire>(response.trim()) {
            Ok(ToolCallWire::Invocation(invocation)) => Ok(invocation),
            Ok(ToolCallWire::Native { name, arguments }) => {
                let args = arguments_to_args(&name, arguments)?;
                Ok(Invocation::new(name, args))
            }
            Err(e) => Err(AgentError::Parse {
                reason: format!("response is not a structured tool call: {e}"),
            }),
        };

        let plain_text = !response.trim_start().starts_with('{');
        match (parsed, &self.text_fallback) {
            (Err(AgentError::Parse { .. }), Some(tool)) if plain_text => {
                debug!(fallback = %tool, "plain-text reply mapped to fallback tool");
                let mut args = Args::new();
                args.insert("message".to_string(), Value::String(response.to_string()));
                Ok(Invocation::new(tool.clone(), args))
            }
            (result, _) => result,
        }
    }
}

//! Scripted stand-ins for the model-calling collaborator.
//!
//! No network calls are made. Each model replays or computes replies
//! deterministically so scenarios and tests are reproducible.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use agentry_contracts::{
    error::{AgentError, AgentResult},
    prompt::{Prompt, Role},
};
use agentry_core::traits::ModelClient;

use crate::mock_data::{extracted_invoice, find_invoice_number};

// ── Reply builders ────────────────────────────────────────────────────────────

/// A reply in the fenced JSON action format, with a line of reasoning first.
pub fn json_action_reply(tool: &str, args: Value) -> String {
    let body = serde_json::json!({ "tool": tool, "args": args });
    format!("Next step: {tool}.\n```action\n{body}\n```")
}

/// A reply in the native tool-call shape, with arguments as a JSON string.
pub fn tool_call_reply(tool: &str, args: Value) -> String {
    serde_json::json!({ "name": tool, "arguments": args.to_string() }).to_string()
}

// ── ScriptedModel ─────────────────────────────────────────────────────────────

/// Replays a fixed list of replies in order.
///
/// Every prompt received is recorded. Once the script is exhausted further
/// calls fail with `ModelCall`. The first `rate_limits` calls can be made to
/// fail with `RateLimited` to exercise retry.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    prompts: Arc<Mutex<Vec<Prompt>>>,
    rate_limits: AtomicU32,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Arc::new(Mutex::new(Vec::new())),
            rate_limits: AtomicU32::new(0),
        }
    }

    /// Fail the first `n` calls with `RateLimited` before replaying.
    pub fn with_rate_limits(self, n: u32) -> Self {
        self.rate_limits.store(n, Ordering::SeqCst);
        self
    }

    /// Prompts received so far, including rate-limited attempts.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl ModelClient for ScriptedModel {
    fn call(&self, prompt: &Prompt) -> AgentResult<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.clone());

        let throttled = self
            .rate_limits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if throttled {
            return Err(AgentError::RateLimited {
                reason: "scripted throttle".to_string(),
            });
        }

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| AgentError::ModelCall {
                reason: "script exhausted".to_string(),
            })
    }
}

// ── FnModel ───────────────────────────────────────────────────────────────────

/// Computes each reply from the call index and the prompt.
///
/// Used where a reply depends on an earlier tool result, such as a
/// transaction id only known at run time.
pub struct FnModel<F> {
    calls: AtomicUsize,
    reply: F,
}

impl<F> FnModel<F>
where
    F: Fn(usize, &Prompt) -> AgentResult<String> + Send + Sync,
{
    pub fn new(reply: F) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> ModelClient for FnModel<F>
where
    F: Fn(usize, &Prompt) -> AgentResult<String> + Send + Sync,
{
    fn call(&self, prompt: &Prompt) -> AgentResult<String> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        (self.reply)(index, prompt)
    }
}

// ── ExtractionModel ───────────────────────────────────────────────────────────

/// The `"fast"` tier: returns the mock extraction for the invoice number
/// found in the last user message.
#[derive(Debug, Default)]
pub struct ExtractionModel;

impl ModelClient for ExtractionModel {
    fn call(&self, prompt: &Prompt) -> AgentResult<String> {
        let document = prompt
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let fields = find_invoice_number(document)
            .and_then(|number| extracted_invoice(&number))
            .ok_or_else(|| AgentError::ModelCall {
                reason: "no recognizable invoice in document".to_string(),
            })?;
        Ok(fields.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use agentry_contracts::prompt::Message;

    use super::*;

    #[test]
    fn scripted_model_replays_then_fails() {
        let model = ScriptedModel::new(["one", "two"]);
        let prompt = Prompt::default();
        assert_eq!(model.call(&prompt).unwrap(), "one");
        assert_eq!(model.call(&prompt).unwrap(), "two");
        assert!(matches!(model.call(&prompt), Err(AgentError::ModelCall { .. })));
        assert_eq!(model.prompts().len(), 3);
    }

    #[test]
    fn scripted_rate_limits_come_first() {
        let model = ScriptedModel::new(["ok"]).with_rate_limits(2);
        let prompt = Prompt::default();
        assert!(matches!(model.call(&prompt), Err(AgentError::RateLimited { .. })));
        assert!(matches!(model.call(&prompt), Err(AgentError::RateLimited { .. })));
        assert_eq!(model.call(&prompt).unwrap(), "ok");
        assert_eq!(model.remaining(), 0);
    }

    #[test]
    fn extraction_model_reads_last_user_message() {
        let prompt = Prompt::new(vec![
            Message::system("extract"),
            Message::user("INVOICE INV-3\n..."),
        ]);
        let reply: Value = serde_json::from_str(&ExtractionModel.call(&prompt).unwrap()).unwrap();
        assert_eq!(reply["vendor"], json!("Cedar Ridge IT Services"));
    }

    #[test]
    fn reply_builders_round_trip_through_json() {
        let native: Value =
            serde_json::from_str(&tool_call_reply("get_invoice", json!({ "invoice_number": "INV-1" })))
                .unwrap();
        assert_eq!(native["name"], json!("get_invoice"));
        assert!(native["arguments"].is_string());

        let fenced = json_action_reply("terminate", json!({ "message": "done" }));
        assert!(fenced.contains("```action\n{"));
    }
}

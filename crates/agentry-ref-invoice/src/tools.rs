//! Invoice, storage and system tools for the reference agent.
//!
//! | Tool             | Tag        | Needs context for          |
//! |------------------|------------|----------------------------|
//! | `extract_invoice`| invoices   | the `"fast"` model tier    |
//! | `store_invoice`  | invoices   | storage                    |
//! | `get_invoice`    | invoices   | storage                    |
//! | `list_invoices`  | invoices   | storage                    |
//! | `store_data`     | storage    | storage                    |
//! | `get_data`       | storage    | storage                    |
//! | `terminate`      | system     | nothing; ends the run      |

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use agentry_contracts::{
    error::{AgentError, AgentResult},
    invocation::Args,
    prompt::{Message, Prompt},
};
use agentry_core::{
    context::ActionContext,
    traits::{ModelClient, Storage},
    Action, ActionRegistry,
};

pub const INVOICES_TAG: &str = "invoices";
pub const STORAGE_TAG: &str = "storage";
pub const SYSTEM_TAG: &str = "system";

/// Storage collection holding invoices keyed by invoice number.
pub const INVOICES_COLLECTION: &str = "invoices";

/// Model tier used for field extraction.
pub const EXTRACTION_TIER: &str = "fast";

const EXTRACTION_INSTRUCTIONS: &str = "Extract the invoice in the user message into a JSON object \
with the keys invoice_number, vendor, date, total and line_items. Reply with the JSON object only.";

// ── Argument helpers ──────────────────────────────────────────────────────────

fn str_arg<'a>(tool: &str, args: &'a Args, key: &str) -> AgentResult<&'a str> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| AgentError::InvalidArguments {
            tool: tool.to_string(),
            reason: format!("'{key}' must be a string"),
        })
}

fn storage(tool: &str, context: Option<&ActionContext>) -> AgentResult<Arc<dyn Storage>> {
    context
        .and_then(ActionContext::storage)
        .ok_or_else(|| AgentError::ToolExecution {
            tool: tool.to_string(),
            reason: "no storage is configured for this run".to_string(),
        })
}

// ── Invoice tools ─────────────────────────────────────────────────────────────

fn extract_invoice() -> Action {
    Action::from_fn(
        "extract_invoice",
        "Extract structured fields (number, vendor, date, total, line items) from an invoice document.",
        |args, context| {
            let document = str_arg("extract_invoice", args, "document")?;
            let context = context.ok_or_else(|| AgentError::ToolExecution {
                tool: "extract_invoice".to_string(),
                reason: "no context".to_string(),
            })?;
            let model = context
                .model(EXTRACTION_TIER)
                .or_else(|| context.default_model())
                .ok_or_else(|| AgentError::ToolExecution {
                    tool: "extract_invoice".to_string(),
                    reason: "no extraction model configured".to_string(),
                })?;

            let prompt = Prompt::new(vec![
                Message::system(EXTRACTION_INSTRUCTIONS),
                Message::user(document),
            ]);
            let reply = model.call(&prompt).map_err(|e| AgentError::ToolExecution {
                tool: "extract_invoice".to_string(),
                reason: e.to_string(),
            })?;

            match serde_json::from_str::<Value>(reply.trim()) {
                Ok(fields @ Value::Object(_)) => Ok(fields),
                _ => Err(AgentError::ToolExecution {
                    tool: "extract_invoice".to_string(),
                    reason: "extraction model did not return a JSON object".to_string(),
                }),
            }
        },
    )
    .with_parameters(json!({
        "type": "object",
        "properties": { "document": { "type": "string" } },
        "required": ["document"]
    }))
    .requires_context()
    .with_tags([INVOICES_TAG])
}

fn store_invoice() -> Action {
    Action::from_fn(
        "store_invoice",
        "Store an extracted invoice under its invoice_number.",
        |args, context| {
            let invoice = args.get("invoice").cloned().unwrap_or(Value::Null);
            let number = invoice
                .get("invoice_number")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| AgentError::InvalidArguments {
                    tool: "store_invoice".to_string(),
                    reason: "invoice.invoice_number must be a string".to_string(),
                })?;
            storage("store_invoice", context)?.set_in_collection(INVOICES_COLLECTION, &number, invoice)?;
            debug!(invoice_number = %number, "invoice stored");
            Ok(json!({ "status": "stored", "invoice_number": number }))
        },
    )
    .with_parameters(json!({
        "type": "object",
        "properties": {
            "invoice": {
                "type": "object",
                "properties": { "invoice_number": { "type": "string" } },
                "required": ["invoice_number"]
            }
        },
        "required": ["invoice"]
    }))
    .requires_context()
    .with_tags([INVOICES_TAG])
}

fn get_invoice() -> Action {
    Action::from_fn(
        "get_invoice",
        "Look up a stored invoice by invoice_number.",
        |args, context| {
            let number = str_arg("get_invoice", args, "invoice_number")?;
            storage("get_invoice", context)?
                .get_from_collection(INVOICES_COLLECTION, number)?
                .ok_or_else(|| AgentError::ToolExecution {
                    tool: "get_invoice".to_string(),
                    reason: format!("invoice '{number}' is not stored"),
                })
        },
    )
    .with_parameters(json!({
        "type": "object",
        "properties": { "invoice_number": { "type": "string" } },
        "required": ["invoice_number"]
    }))
    .requires_context()
    .with_tags([INVOICES_TAG])
}

fn list_invoices() -> Action {
    Action::from_fn(
        "list_invoices",
        "List the invoice numbers currently stored.",
        |_, context| {
            let invoices = storage("list_invoices", context)?.list_collection(INVOICES_COLLECTION)?;
            let numbers: Vec<&String> = invoices.keys().collect();
            Ok(json!({ "count": numbers.len(), "invoices": numbers }))
        },
    )
    .requires_context()
    .with_tags([INVOICES_TAG])
}

// ── Generic storage tools ─────────────────────────────────────────────────────

fn store_data() -> Action {
    Action::from_fn(
        "store_data",
        "Store any JSON value under collection/key.",
        |args, context| {
            let collection = str_arg("store_data", args, "collection")?;
            let key = str_arg("store_data", args, "key")?;
            let value = args.get("value").cloned().unwrap_or(Value::Null);
            storage("store_data", context)?.set_in_collection(collection, key, value)?;
            Ok(json!({ "status": "stored", "collection": collection, "key": key }))
        },
    )
    .with_parameters(json!({
        "type": "object",
        "properties": {
            "collection": { "type": "string" },
            "key": { "type": "string" },
            "value": {}
        },
        "required": ["collection", "key", "value"]
    }))
    .requires_context()
    .with_tags([STORAGE_TAG])
}

fn get_data() -> Action {
    Action::from_fn(
        "get_data",
        "Read the JSON value stored under collection/key.",
        |args, context| {
            let collection = str_arg("get_data", args, "collection")?;
            let key = str_arg("get_data", args, "key")?;
            let value = storage("get_data", context)?.get_from_collection(collection, key)?;
            Ok(json!({ "found": value.is_some(), "value": value }))
        },
    )
    .with_parameters(json!({
        "type": "object",
        "properties": {
            "collection": { "type": "string" },
            "key": { "type": "string" }
        },
        "required": ["collection", "key"]
    }))
    .requires_context()
    .with_tags([STORAGE_TAG])
}

// ── System ────────────────────────────────────────────────────────────────────

fn terminate() -> Action {
    Action::from_fn(
        "terminate",
        "Finish the task and report a summary message.",
        |args, _| {
            let message = str_arg("terminate", args, "message")?;
            Ok(json!({ "message": message }))
        },
    )
    .with_parameters(json!({
        "type": "object",
        "properties": { "message": { "type": "string" } },
        "required": ["message"]
    }))
    .terminal()
    .with_tags([SYSTEM_TAG])
}

/// Every reference tool, unregistered.
pub fn invoice_actions() -> Vec<Action> {
    vec![
        extract_invoice(),
        store_invoice(),
        get_invoice(),
        list_invoices(),
        store_data(),
        get_data(),
        terminate(),
    ]
}

/// A registry holding every reference tool.
pub fn reference_registry() -> AgentResult<ActionRegistry> {
    let mut registry = ActionRegistry::new();
    for action in invoice_actions() {
        registry.register(action)?;
    }
    Ok(registry)
}

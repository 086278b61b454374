//! # agentry-storage
//!
//! Backends for the `Storage` trait defined in `agentry-core`.
//!
//! A store is a two-level map: named collections, each holding string keys
//! mapped to arbitrary JSON values. Tools reach it through
//! `ActionContext::storage()`.
//!
//! - `JsonFileStorage` persists the whole document to one JSON file after
//!   every mutation.
//! - `InMemoryStorage` keeps everything in process, for tests and demos.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agentry_storage::JsonFileStorage;
//! use agentry_core::traits::Storage;
//!
//! let storage = JsonFileStorage::open("agent_storage.json");
//! storage.set_in_collection("invoices", "INV-1", json!({"total": 100}))?;
//! ```

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStorage;
pub use memory::InMemoryStorage;

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// The shape of a store: collection name to key/value map.
pub type Document = BTreeMap<String, Map<String, Value>>;

/// Borrow `name` mutably, creating it when missing.
pub(crate) fn collection_mut<'d>(doc: &'d mut Document, name: &str) -> &'d mut Map<String, Value> {
    doc.entry(name.to_string()).or_default()
}

//! Shared resources handed to handlers that declare `requires_context`.
//!
//! One `ActionContext` is built per run and shared as `Arc<ActionContext>`.
//! Every field sits behind a lock so a `set_*` call made by one holder is
//! visible to all of them. The state is run-global and mutable.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use serde_json::{Map, Value};

use crate::{
    agent::Agent,
    memory::Memory,
    traits::{ModelClient, Storage},
};

/// Tier name used when a caller does not ask for a specific model.
pub const DEFAULT_TIER: &str = "default";

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

/// Typed bundle of run-wide resources.
pub struct ActionContext {
    models: RwLock<HashMap<String, Arc<dyn ModelClient>>>,
    agent: RwLock<Weak<Agent>>,
    memory: RwLock<Option<Memory>>,
    storage: RwLock<Option<Arc<dyn Storage>>>,
    metadata: RwLock<Map<String, Value>>,
}

impl ActionContext {
    pub fn new() -> Self {
        Self {
            models: RwLock::new(HashMap::new()),
            agent: RwLock::new(Weak::new()),
            memory: RwLock::new(None),
            storage: RwLock::new(None),
            metadata: RwLock::new(Map::new()),
        }
    }

    // ── Construction-time builders ───────────────────────────────────────────

    pub fn with_model(self, tier: impl Into<String>, model: Arc<dyn ModelClient>) -> Self {
        self.set_model(tier, model);
        self
    }

    pub fn with_storage(self, storage: Arc<dyn Storage>) -> Self {
        self.set_storage(storage);
        self
    }

    pub fn with_metadata(self, key: impl Into<String>, value: Value) -> Self {
        self.set_metadata(key, value);
        self
    }

    // ── Models by tier ───────────────────────────────────────────────────────

    /// The model registered under `tier` (e.g. "fast", "powerful").
    pub fn model(&self, tier: &str) -> Option<Arc<dyn ModelClient>> {
        read(&self.models).get(tier).cloned()
    }

    pub fn default_model(&self) -> Option<Arc<dyn ModelClient>> {
        self.model(DEFAULT_TIER)
    }

    /// Install or replace the model for `tier`.
    pub fn set_model(&self, tier: impl Into<String>, model: Arc<dyn ModelClient>) {
        write(&self.models).insert(tier.into(), model);
    }

    pub fn model_tiers(&self) -> Vec<String> {
        let mut tiers: Vec<String> = read(&self.models).keys().cloned().collect();
        tiers.sort();
        tiers
    }

    // ── Agent back-reference ─────────────────────────────────────────────────

    /// The agent driving this run, if it is still alive and was bound.
    pub fn agent(&self) -> Option<Arc<Agent>> {
        read(&self.agent).upgrade()
    }

    pub fn bind_agent(&self, agent: &Arc<Agent>) {
        *write(&self.agent) = Arc::downgrade(agent);
    }

    // ── Memory ───────────────────────────────────────────────────────────────

    /// The current run's memory handle.
    pub fn memory(&self) -> Option<Memory> {
        read(&self.memory).clone()
    }

    pub fn set_memory(&self, memory: Memory) {
        *write(&self.memory) = Some(memory);
    }

    // ── Storage ──────────────────────────────────────────────────────────────

    pub fn storage(&self) -> Option<Arc<dyn Storage>> {
        read(&self.storage).clone()
    }

    pub fn set_storage(&self, storage: Arc<dyn Storage>) {
        *write(&self.storage) = Some(storage);
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    pub fn metadata(&self, key: &str) -> Option<Value> {
        read(&self.metadata).get(key).cloned()
    }

    pub fn set_metadata(&self, key: impl Into<String>, value: Value) {
        write(&self.metadata).insert(key.into(), value);
    }

    /// A copy of the whole metadata map.
    pub fn metadata_snapshot(&self) -> Map<String, Value> {
        read(&self.metadata).clone()
    }
}

impl Default for ActionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("models", &self.model_tiers())
            .field("has_agent", &self.agent().is_some())
            .field("has_memory", &read(&self.memory).is_some())
            .field("has_storage", &read(&self.storage).is_some())
            .field("metadata", &*read(&self.metadata))
            .finish()
    }
}

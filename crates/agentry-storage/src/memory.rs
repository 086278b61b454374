//! Process-local storage.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{Map, Value};

use agentry_contracts::error::{AgentError, AgentResult};
use agentry_core::traits::Storage;

use crate::{collection_mut, Document};

/// A `Storage` that never touches disk.
///
/// Clones share the same document.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    doc: Arc<Mutex<Document>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store from an existing document.
    pub fn from_document(doc: Document) -> Self {
        Self {
            doc: Arc::new(Mutex::new(doc)),
        }
    }

    fn lock(&self) -> AgentResult<MutexGuard<'_, Document>> {
        self.doc.lock().map_err(|e| AgentError::Storage {
            reason: format!("storage lock poisoned: {}", e),
        })
    }
}

impl Storage for InMemoryStorage {
    fn get_collection(&self, name: &str) -> AgentResult<Map<String, Value>> {
        let mut doc = self.lock()?;
        Ok(collection_mut(&mut doc, name).clone())
    }

    fn set_in_collection(&self, name: &str, key: &str, value: Value) -> AgentResult<()> {
        let mut doc = self.lock()?;
        collection_mut(&mut doc, name).insert(key.to_string(), value);
        Ok(())
    }

    fn get_from_collection(&self, name: &str, key: &str) -> AgentResult<Option<Value>> {
        let doc = self.lock()?;
        Ok(doc.get(name).and_then(|c| c.get(key)).cloned())
    }

    fn delete_from_collection(&self, name: &str, key: &str) -> AgentResult<bool> {
        let mut doc = self.lock()?;
        Ok(collection_mut(&mut doc, name).remove(key).is_some())
    }

    fn clear_collection(&self, name: &str) -> AgentResult<()> {
        let mut doc = self.lock()?;
        collection_mut(&mut doc, name).clear();
        Ok(())
    }

    fn clear_all(&self) -> AgentResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

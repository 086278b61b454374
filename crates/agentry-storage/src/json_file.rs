//! Single-file JSON storage.
//!
//! The whole store lives in one pretty-printed JSON document. It is loaded
//! once when opened and every mutation follows the same cycle:
//!
//! 1. Reload the document from disk, so writes made by another handle on the
//!    same file are not clobbered. If the reload fails the cached copy is used.
//! 2. Apply the change.
//! 3. Write the full document back before returning.
//!
//! Reads are served from the cached copy. There is no locking across
//! processes; two writers racing on the same file can lose updates.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use agentry_contracts::error::{AgentError, AgentResult};
use agentry_core::traits::Storage;

use crate::{collection_mut, Document};

/// A `Storage` persisted to a JSON file.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    cache: Mutex<Document>,
}

impl JsonFileStorage {
    /// Open the store at `path`.
    ///
    /// A missing or unreadable file yields an empty store; the file is
    /// created on the first mutation.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let doc = match load(&path) {
            Ok(doc) => doc,
            Err(e) => {
                if path.exists() {
                    warn!(path = %path.display(), error = %e, "could not load storage file, starting empty");
                } else {
                    debug!(path = %path.display(), "storage file does not exist yet");
                }
                Document::new()
            }
        };
        Self {
            path,
            cache: Mutex::new(doc),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> AgentResult<MutexGuard<'_, Document>> {
        self.cache.lock().map_err(|e| AgentError::Storage {
            reason: format!("storage lock poisoned: {}", e),
        })
    }

    /// Run the reload, mutate, save cycle.
    fn mutate<T>(&self, f: impl FnOnce(&mut Document) -> T) -> AgentResult<T> {
        let mut cache = self.lock()?;
        if self.path.exists() {
            match load(&self.path) {
                Ok(fresh) => *cache = fresh,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "reload failed, writing over cached copy")
                }
            }
        }
        let out = f(&mut cache);
        save(&self.path, &cache)?;
        Ok(out)
    }
}

fn load(path: &Path) -> AgentResult<Document> {
    let raw = fs::read_to_string(path).map_err(|e| AgentError::Storage {
        reason: format!("cannot read '{}': {}", path.display(), e),
    })?;
    serde_json::from_str(&raw).map_err(|e| AgentError::Storage {
        reason: format!("'{}' is not a storage document: {}", path.display(), e),
    })
}

fn save(path: &Path, doc: &Document) -> AgentResult<()> {
    let body = serde_json::to_string_pretty(doc).map_err(|e| AgentError::Storage {
        reason: format!("cannot serialize storage document: {}", e),
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| AgentError::Storage {
            reason: format!("cannot create '{}': {}", parent.display(), e),
        })?;
    }
    fs::write(path, body).map_err(|e| AgentError::Storage {
        reason: format!("cannot write '{}': {}", path.display(), e),
    })
}

impl Storage for JsonFileStorage {
    fn get_collection(&self, name: &str) -> AgentResult<Map<String, Value>> {
        let mut cache = self.lock()?;
        Ok(collection_mut(&mut cache, name).clone())
    }

    fn set_in_collection(&self, name: &str, key: &str, value: Value) -> AgentResult<()> {
        self.mutate(|doc| {
            collection_mut(doc, name).insert(key.to_string(), value);
        })
    }

    fn get_from_collection(&self, name: &str, key: &str) -> AgentResult<Option<Value>> {
        let cache = self.lock()?;
        Ok(cache.get(name).and_then(|c| c.get(key)).cloned())
    }

    fn delete_from_collection(&self, name: &str, key: &str) -> AgentResult<bool> {
        self.mutate(|doc| collection_mut(doc, name).remove(key).is_some())
    }

    fn clear_collection(&self, name: &str) -> AgentResult<()> {
        self.mutate(|doc| collection_mut(doc, name).clear())
    }

    fn clear_all(&self) -> AgentResult<()> {
        self.mutate(|doc| doc.clear())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::open(dir.path().join("store.json"));
        assert!(storage.get_collection("invoices").unwrap().is_empty());
        assert!(!storage.path().exists());
    }

    #[test]
    fn set_then_reopen_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let storage = JsonFileStorage::open(&path);
        storage
            .set_in_collection("invoices", "INV-1", json!({ "total": 100 }))
            .unwrap();

        let reopened = JsonFileStorage::open(&path);
        assert_eq!(
            reopened.get_from_collection("invoices", "INV-1").unwrap(),
            Some(json!({ "total": 100 }))
        );
    }

    #[test]
    fn file_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        JsonFileStorage::open(&path)
            .set_in_collection("data", "k", json!("v"))
            .unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  \"data\""));
    }

    #[test]
    fn corrupt_file_starts_empty_and_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "not json").unwrap();

        let storage = JsonFileStorage::open(&path);
        assert!(storage.get_collection("data").unwrap().is_empty());

        storage.set_in_collection("data", "k", json!(1)).unwrap();
        let reopened = JsonFileStorage::open(&path);
        assert_eq!(reopened.get_from_collection("data", "k").unwrap(), Some(json!(1)));
    }

    #[test]
    fn mutation_picks_up_writes_from_other_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let a = JsonFileStorage::open(&path);
        let b = JsonFileStorage::open(&path);

        a.set_in_collection("data", "from_a", json!(1)).unwrap();
        b.set_in_collection("data", "from_b", json!(2)).unwrap();

        let merged = JsonFileStorage::open(&path).get_collection("data").unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn delete_and_clear_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let storage = JsonFileStorage::open(&path);
        storage.set_in_collection("a", "k", json!(1)).unwrap();
        storage.set_in_collection("b", "k", json!(1)).unwrap();

        assert!(storage.delete_from_collection("a", "k").unwrap());
        assert!(!storage.delete_from_collection("a", "k").unwrap());

        storage.clear_all().unwrap();
        let reopened = JsonFileStorage::open(&path);
        assert!(reopened.get_collection("b").unwrap().is_empty());
    }

    #[test]
    fn save_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        // The target path is a directory, so the write fails.
        let storage = JsonFileStorage::open(dir.path());
        let err = storage.set_in_collection("data", "k", json!(1)).unwrap_err();
        assert!(matches!(err, AgentError::Storage { .. }));
    }

    #[test]
    fn values_survive_reload_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let values = vec![
            json!(1.0715660391465826e-75),
            json!(0.1),
            json!(1425.5),
            json!(f64::MAX),
            json!(5e-324),
            json!(null),
            json!([[1, [2.5, null]], [], ["x"]]),
            json!({ "vendor": "Café Ödön 東京 🚚", "lines": [{ "qty": 3, "price": 19.99 }] }),
            json!(u64::MAX),
            json!(-42),
        ];

        let storage = JsonFileStorage::open(&path);
        for (i, value) in values.iter().enumerate() {
            storage
                .set_in_collection("data", &format!("k{i}"), value.clone())
                .unwrap();
        }
        // Another mutation reloads everything written above from disk.
        storage.set_in_collection("other", "k", json!(true)).unwrap();

        let reopened = JsonFileStorage::open(&path);
        for (i, value) in values.iter().enumerate() {
            let key = format!("k{i}");
            assert_eq!(storage.get_from_collection("data", &key).unwrap().as_ref(), Some(value));
            assert_eq!(reopened.get_from_collection("data", &key).unwrap().as_ref(), Some(value));
        }
    }
}

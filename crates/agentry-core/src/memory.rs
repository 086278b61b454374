//! The ordered, append-only conversation log for one agent run.
//!
//! `Memory` is a handle: clones share the same log. The agent appends to it
//! while tools holding the run's `ActionContext` read it. Entries are never
//! removed; filtering produces an independent derived copy.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use agentry_contracts::memory::{MemoryEntry, MemoryType};

/// A shared, append-only log of `MemoryEntry` values.
#[derive(Clone, Default)]
pub struct Memory {
    entries: Arc<Mutex<Vec<MemoryEntry>>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh log holding `entries` in order.
    pub fn from_entries(entries: Vec<MemoryEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    // A poisoned lock still holds a consistent Vec: pushes are atomic.
    fn lock(&self) -> MutexGuard<'_, Vec<MemoryEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn append(&self, entry: MemoryEntry) {
        self.lock().push(entry);
    }

    pub fn add(&self, kind: MemoryType, content: impl Into<String>) {
        self.append(MemoryEntry::new(kind, content));
    }

    /// All entries, in insertion order.
    pub fn entries(&self) -> Vec<MemoryEntry> {
        self.lock().clone()
    }

    /// The first `limit` entries, or all of them when `limit` is `None`.
    pub fn recall(&self, limit: Option<usize>) -> Vec<MemoryEntry> {
        let entries = self.lock();
        match limit {
            Some(n) => entries.iter().take(n).cloned().collect(),
            None => entries.clone(),
        }
    }

    pub fn last(&self) -> Option<MemoryEntry> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// An independent copy with every `system` entry dropped.
    pub fn without_system(&self) -> Memory {
        let kept = self
            .lock()
            .iter()
            .filter(|e| e.kind != MemoryType::System)
            .cloned()
            .collect();
        Memory::from_entries(kept)
    }

    /// An independent deep copy; later appends to either side are not shared.
    pub fn snapshot(&self) -> Memory {
        Memory::from_entries(self.entries())
    }

    /// True when both handles point at the same log.
    pub fn shares_log_with(&self, other: &Memory) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.lock().iter()).finish()
    }
}

impl Serialize for Memory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Memory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<MemoryEntry>::deserialize(deserializer).map(Memory::from_entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(entries: &[MemoryEntry]) -> Vec<MemoryType> {
        entries.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn preserves_insertion_order() {
        let memory = Memory::new();
        for i in 0..20 {
            memory.append(MemoryEntry::user(format!("turn-{i}")));
        }

        let contents: Vec<String> = memory.entries().into_iter().map(|e| e.content).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("turn-{i}")).collect();
        assert_eq!(contents, expected);
    }

    #[test]
    fn without_system_drops_only_system_entries() {
        let memory = Memory::new();
        memory.append(MemoryEntry::system("s1"));
        memory.append(MemoryEntry::user("u1"));
        memory.append(MemoryEntry::assistant("a1"));
        memory.append(MemoryEntry::system("s2"));
        memory.append(MemoryEntry::environment("e1"));
        memory.append(MemoryEntry::user("u2"));

        let filtered = memory.without_system();
        assert_eq!(
            kinds(&filtered.entries()),
            vec![
                MemoryType::User,
                MemoryType::Assistant,
                MemoryType::Environment,
                MemoryType::User
            ]
        );
        let contents: Vec<String> = filtered.entries().into_iter().map(|e| e.content).collect();
        assert_eq!(contents, vec!["u1", "a1", "e1", "u2"]);

        // The source log is untouched.
        assert_eq!(memory.len(), 6);
    }

    #[test]
    fn clones_share_the_log_but_snapshots_do_not() {
        let memory = Memory::new();
        let handle = memory.clone();
        let snapshot = memory.snapshot();

        handle.append(MemoryEntry::user("shared"));

        assert_eq!(memory.len(), 1);
        assert!(memory.shares_log_with(&handle));
        assert!(snapshot.is_empty());
        assert!(!memory.shares_log_with(&snapshot));
    }

    #[test]
    fn recall_limits_from_the_front() {
        let memory = Memory::from_entries(vec![
            MemoryEntry::user("a"),
            MemoryEntry::assistant("b"),
            MemoryEntry::environment("c"),
        ]);

        assert_eq!(memory.recall(Some(2)).len(), 2);
        assert_eq!(memory.recall(Some(2))[1].content, "b");
        assert_eq!(memory.recall(None).len(), 3);
        assert_eq!(memory.recall(Some(10)).len(), 3);
    }

    #[test]
    fn serializes_as_entry_list() {
        let memory = Memory::from_entries(vec![MemoryEntry::user("task")]);
        let json = serde_json::to_string(&memory).unwrap();
        assert_eq!(json, r#"[{"type":"user","content":"task"}]"#);

        let restored: Memory = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.entries(), memory.entries());
    }
}

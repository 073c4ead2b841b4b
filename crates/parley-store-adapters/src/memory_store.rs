use async_trait::async_trait;
use parley_contract::{
    Committed, StoreError, Thread, ThreadHead, ThreadStateStore, Version, VersionPrecondition,
};
use std::collections::HashMap;

struct MemoryEntry {
    thread: Thread,
    version: Version,
}

/// In-memory storage for testing and local development.
#[derive(Default)]
pub struct MemoryStore {
    entries: tokio::sync::RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    /// Create a new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThreadStateStore for MemoryStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ThreadHead>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries.get(thread_id).map(|e| ThreadHead {
            thread: e.thread.clone(),
            version: e.version,
        }))
    }

    async fn save(
        &self,
        thread: &Thread,
        precondition: VersionPrecondition,
    ) -> Result<Committed, StoreError> {
        let mut entries = self.entries.write().await;
        // An id that has never been saved counts as version 0.
        let current = entries.get(&thread.id).map_or(0, |e| e.version);
        if let VersionPrecondition::Exact(expected) = precondition {
            if current != expected {
                return Err(StoreError::Conflict {
                    expected,
                    actual: current,
                });
            }
        }
        let version = current + 1;
        entries.insert(
            thread.id.clone(),
            MemoryEntry {
                thread: thread.clone(),
                version,
            },
        );
        Ok(Committed { version })
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.read().await;
        let mut ids: Vec<String> = entries.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, thread_id: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        entries.remove(thread_id);
        Ok(())
    }
}

use async_trait::async_trait;
use parley_contract::{
    Committed, StoreError, Thread, ThreadHead, ThreadStateStore, Version, VersionPrecondition,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Current on-disk document format version.
const SCHEMA_VERSION: u32 = 1;

/// Persisted envelope: schema marker plus the optimistic-concurrency
/// version alongside the thread itself.
#[derive(Debug, Serialize, Deserialize)]
struct StoredThread {
    schema: u32,
    version: Version,
    thread: Thread,
}

/// One pretty-printed JSON document per thread under a base directory.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a new file storage with the given base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn thread_path(&self, thread_id: &str) -> Result<PathBuf, StoreError> {
        Self::validate_thread_id(thread_id)?;
        Ok(self.base_path.join(format!("{thread_id}.json")))
    }

    /// Validate that a thread ID is safe for use as a filename.
    /// Rejects path separators, `..`, and control characters.
    fn validate_thread_id(thread_id: &str) -> Result<(), StoreError> {
        if thread_id.is_empty() {
            return Err(StoreError::InvalidId("thread id cannot be empty".to_string()));
        }
        if thread_id.contains('/')
            || thread_id.contains('\\')
            || thread_id.contains("..")
            || thread_id.contains('\0')
        {
            return Err(StoreError::InvalidId(format!(
                "thread id contains invalid characters: {thread_id:?}"
            )));
        }
        if thread_id.chars().any(|c| c.is_control()) {
            return Err(StoreError::InvalidId(format!(
                "thread id contains control characters: {thread_id:?}"
            )));
        }
        Ok(())
    }

    async fn load_document(&self, thread_id: &str) -> Result<Option<StoredThread>, StoreError> {
        let path = self.thread_path(thread_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&path).await?;
        let document: StoredThread = serde_json::from_str(&content)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if document.schema > SCHEMA_VERSION {
            return Err(StoreError::Serialization(format!(
                "thread document schema {} is newer than supported {SCHEMA_VERSION}",
                document.schema
            )));
        }
        Ok(Some(document))
    }

    /// Write a thread document atomically: temp file, flush, fsync, rename.
    async fn save_document(&self, document: &StoredThread) -> Result<(), StoreError> {
        if !self.base_path.exists() {
            tokio::fs::create_dir_all(&self.base_path).await?;
        }
        let path = self.thread_path(&document.thread.id)?;
        let content = serde_json::to_string_pretty(document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let tmp_path = self.base_path.join(format!(
            ".{}.{}.tmp",
            document.thread.id,
            uuid::Uuid::new_v4().simple()
        ));

        let write_result = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(content.as_bytes()).await?;
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            match tokio::fs::rename(&tmp_path, &path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tokio::fs::remove_file(&path).await?;
                    tokio::fs::rename(&tmp_path, &path).await?;
                }
                Err(e) => return Err(e),
            }
            Ok::<(), std::io::Error>(())
        }
        .await;

        if let Err(e) = write_result {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StoreError::Unavailable(e.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ThreadStateStore for FileStore {
    async fn load(&self, thread_id: &str) -> Result<Option<ThreadHead>, StoreError> {
        Ok(self.load_document(thread_id).await?.map(|d| ThreadHead {
            thread: d.thread,
            version: d.version,
        }))
    }

    async fn save(
        &self,
        thread: &Thread,
        precondition: VersionPrecondition,
    ) -> Result<Committed, StoreError> {
        let current = self
            .load_document(&thread.id)
            .await?
            .map_or(0, |d| d.version);
        if let VersionPrecondition::Exact(expected) = precondition {
            if current != expected {
                return Err(StoreError::Conflict {
                    expected,
                    actual: current,
                });
            }
        }
        let version = current + 1;
        self.save_document(&StoredThread {
            schema: SCHEMA_VERSION,
            version,
            thread: thread.clone(),
        })
        .await?;
        Ok(Committed { version })
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.base_path.exists() {
            return Ok(Vec::new());
        }
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, thread_id: &str) -> Result<(), StoreError> {
        let path = self.thread_path(thread_id)?;
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_contract::Message;
    use tempfile::TempDir;

    #[tokio::test]
    async fn save_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        let thread = Thread::new("test-1").with_message(Message::user("hello"));
        let committed = store.save(&thread, VersionPrecondition::Exact(0)).await.unwrap();
        assert_eq!(committed.version, 1);

        let head = store.load("test-1").await.unwrap().unwrap();
        assert_eq!(head.thread.id, "test-1");
        assert_eq!(head.thread.message_count(), 1);
        assert_eq!(head.thread.messages[0].content, "hello");
        assert_eq!(head.version, 1);
    }

    #[tokio::test]
    async fn load_or_init_unseen_id_is_empty_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        let head = store.load_or_init("never-seen").await.unwrap();
        assert_eq!(head.thread.id, "never-seen");
        assert_eq!(head.thread.message_count(), 0);
        assert_eq!(head.version, 0);
    }

    #[tokio::test]
    async fn stale_precondition_fails_with_conflict_and_keeps_first_write() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        // Two writers both based their update on version 0.
        let first = Thread::new("t1").with_message(Message::user("first"));
        let second = Thread::new("t1").with_message(Message::user("second"));

        store.save(&first, VersionPrecondition::Exact(0)).await.unwrap();
        let err = store
            .save(&second, VersionPrecondition::Exact(0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict {
                expected: 0,
                actual: 1
            }
        ));

        // No lost update, no merge: the first writer's state survives intact.
        let head = store.load("t1").await.unwrap().unwrap();
        assert_eq!(head.thread.messages.len(), 1);
        assert_eq!(head.thread.messages[0].content, "first");
    }

    #[tokio::test]
    async fn precondition_any_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        store
            .save(&Thread::new("t1"), VersionPrecondition::Exact(0))
            .await
            .unwrap();
        let committed = store
            .save(
                &Thread::new("t1").with_message(Message::user("forced")),
                VersionPrecondition::Any,
            )
            .await
            .unwrap();
        assert_eq!(committed.version, 2);
    }

    #[tokio::test]
    async fn list_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        for id in ["thread-a", "thread-b", "thread-c"] {
            store
                .save(&Thread::new(id), VersionPrecondition::Exact(0))
                .await
                .unwrap();
        }
        assert_eq!(
            store.list().await.unwrap(),
            vec!["thread-a", "thread-b", "thread-c"]
        );

        store.delete("thread-b").await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["thread-a", "thread-c"]);

        // Deleting an unknown id is a no-op.
        store.delete("thread-b").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_newer_schema_documents() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path());

        let content = serde_json::json!({
            "schema": SCHEMA_VERSION + 1,
            "version": 3,
            "thread": {"id": "t1", "messages": []}
        });
        tokio::fs::write(
            temp_dir.path().join("t1.json"),
            serde_json::to_string(&content).unwrap(),
        )
        .await
        .unwrap();

        let err = store.load("t1").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn rejects_path_traversal() {
        let store = FileStore::new("/base/path");
        assert!(store.thread_path("../../etc/passwd").is_err());
        assert!(store.thread_path("foo/bar").is_err());
        assert!(store.thread_path("foo\\bar").is_err());
        assert!(store.thread_path("").is_err());
        assert!(store.thread_path("foo\0bar").is_err());
    }

    #[tokio::test]
    async fn versions_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileStore::new(temp_dir.path());
            let thread = Thread::new("t1").with_message(Message::user("one"));
            store.save(&thread, VersionPrecondition::Exact(0)).await.unwrap();
            let thread = thread.with_message(Message::assistant("two"));
            store.save(&thread, VersionPrecondition::Exact(1)).await.unwrap();
        }

        let reopened = FileStore::new(temp_dir.path());
        let head = reopened.load("t1").await.unwrap().unwrap();
        assert_eq!(head.version, 2);
        assert_eq!(head.thread.message_count(), 2);
    }
}

use super::*;

/// Durable mapping from thread identifier to conversation state.
///
/// Callers are expected to drive a given thread id from at most one request
/// at a time; the store does not serialize concurrent invocations. It does
/// detect conflicting writes: a stale [`VersionPrecondition::Exact`] fails
/// with [`StoreError::Conflict`] instead of silently overwriting.
#[async_trait]
pub trait ThreadStateStore: Send + Sync {
    /// Load a thread and its current version. `None` if the id has never
    /// been saved.
    async fn load(&self, thread_id: &str) -> Result<Option<ThreadHead>, StoreError>;

    /// Load a thread, falling back to an empty one at version 0 for unseen
    /// ids. Never fails for unknown identifiers.
    async fn load_or_init(&self, thread_id: &str) -> Result<ThreadHead, StoreError> {
        Ok(self
            .load(thread_id)
            .await?
            .unwrap_or_else(|| ThreadHead::empty(thread_id)))
    }

    /// Atomically replace a thread's state (whole-state replace, not merge).
    /// Each successful save increments the version.
    async fn save(
        &self,
        thread: &Thread,
        precondition: VersionPrecondition,
    ) -> Result<Committed, StoreError>;

    /// List all known thread ids.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Delete a thread. Deleting an unknown id is a no-op.
    async fn delete(&self, thread_id: &str) -> Result<(), StoreError>;
}

//! Thread state store contract and shared persistence types.

use crate::thread::Thread;
use async_trait::async_trait;
use thiserror::Error;

mod traits;

pub use traits::ThreadStateStore;

/// Monotonically increasing version for optimistic concurrency.
///
/// A thread that has never been saved is at version 0; every successful
/// save increments the version by one.
pub type Version = u64;

/// Acknowledgement returned after a successful write.
#[derive(Debug, Clone, Copy)]
pub struct Committed {
    pub version: Version,
}

/// A thread together with its current storage version.
#[derive(Debug, Clone)]
pub struct ThreadHead {
    pub thread: Thread,
    pub version: Version,
}

impl ThreadHead {
    /// The initial head for a thread that has never been saved.
    pub fn empty(thread_id: impl Into<String>) -> Self {
        Self {
            thread: Thread::new(thread_id),
            version: 0,
        }
    }
}

/// Required base version for a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPrecondition {
    /// Overwrite regardless of the stored version.
    Any,
    /// Fail with [`StoreError::Conflict`] unless the stored version matches.
    Exact(Version),
}

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failure. Never silently swallowed: a lost save means the
    /// conversation silently forgets the turn.
    #[error("store backend unavailable: {0}")]
    Unavailable(String),

    /// A conflicting concurrent write was detected.
    #[error("version conflict: expected {expected}, found {actual}")]
    Conflict { expected: Version, actual: Version },

    /// Invalid thread ID (path traversal, control chars, etc.).
    #[error("invalid thread id: {0}")]
    InvalidId(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

//! The thread: a durable, identifier-keyed conversation.

use super::Message;
use serde::{Deserialize, Serialize};

/// A conversation thread with append-only, totally ordered message history.
///
/// Threads are created implicitly on first use of an unseen identifier and
/// mutated only by the orchestrator after a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Thread {
    /// Create an empty thread.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
        }
    }

    /// Append a message, builder style.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Append a message in place.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

//! Invocation request/response shapes shared by every transport.

use crate::thread::Message;
use serde::{Deserialize, Serialize};

/// One inbound invocation: a message targeted at a conversation thread.
///
/// Transient: validated before orchestration, never persisted as an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Opaque, client-supplied thread identifier. Must be stable across
    /// calls to share conversation state.
    pub thread_id: String,
    pub message: String,
}

/// The result of one completed synchronous invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub output: Message,
    pub thread_id: String,
    /// Set when the reply was computed but could not be persisted; the
    /// thread's history may diverge on the next call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_omits_absent_warning() {
        let response = ChatResponse {
            output: Message::assistant("hi"),
            thread_id: "t1".to_string(),
            warning: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("warning"));
    }
}

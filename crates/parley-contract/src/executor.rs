//! The agent computation contract.
//!
//! [`AgentExecutor`] wraps one opaque, possibly multi-step computation that
//! turns (history, new input) into a reply. It is injected into the
//! orchestrator as a capability, never resolved from a global, so any
//! concrete computation (or a test stub) can stand behind it.

use crate::thread::{gen_message_id, Message, Role};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// One incremental piece of an in-progress assistant reply.
///
/// Fragments are ephemeral: they exist only while a streaming invocation is
/// running. The final message appended to the thread is their concatenation
/// in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub role: Role,
    pub content: String,
}

impl Fragment {
    /// Create an assistant fragment.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Executor errors. Every internal failure (model call, internal step) is
/// converted at this boundary; nothing crosses it unclassified.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("computation failed: {0}")]
    ComputationFailed(String),
}

/// A lazy, single-pass sequence of reply fragments. The stream owns its
/// input; restarting requires re-invocation.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, ExecutionError>> + Send>>;

/// The opaque multi-step computation unit behind one conversation turn.
///
/// Implementations never persist anything: persistence is the orchestrator's
/// responsibility, keeping the computation side-effect-free with respect to
/// the thread store. The caller must pass the most recently saved state for
/// the thread (or the initial empty state for a new thread).
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    /// Produce the reply incrementally, one fragment per completed internal
    /// step. The sequence is finite for well-behaved computations, but the
    /// caller must not assume termination: dropping the stream cancels the
    /// computation.
    fn stream(&self, history: &[Message], input: &Message) -> FragmentStream;

    /// Run the computation to completion and return only the final message.
    ///
    /// Default implementation drains [`stream`](Self::stream) and
    /// concatenates fragments in emission order: one underlying computation,
    /// two result shapes.
    async fn invoke(&self, history: &[Message], input: &Message) -> Result<Message, ExecutionError> {
        let mut fragments = self.stream(history, input);
        let mut role = Role::Assistant;
        let mut content = String::new();
        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            role = fragment.role;
            content.push_str(&fragment.content);
        }
        Ok(Message {
            id: Some(gen_message_id()),
            role,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_stream::stream;

    struct ChunkedExecutor(Vec<&'static str>);

    impl AgentExecutor for ChunkedExecutor {
        fn stream(&self, _history: &[Message], _input: &Message) -> FragmentStream {
            let chunks: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
            Box::pin(stream! {
                for chunk in chunks {
                    yield Ok(Fragment::assistant(chunk));
                }
            })
        }
    }

    #[tokio::test]
    async fn invoke_concatenates_fragments_in_emission_order() {
        let executor = ChunkedExecutor(vec!["Hello", ", ", "world"]);
        let reply = executor
            .invoke(&[], &Message::user("hi"))
            .await
            .unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "Hello, world");
        assert!(reply.id.is_some());
    }

    #[tokio::test]
    async fn invoke_surfaces_computation_failure() {
        struct FailingExecutor;
        impl AgentExecutor for FailingExecutor {
            fn stream(&self, _history: &[Message], _input: &Message) -> FragmentStream {
                Box::pin(stream! {
                    yield Ok(Fragment::assistant("partial"));
                    yield Err(ExecutionError::ComputationFailed("model call failed".into()));
                })
            }
        }

        let err = FailingExecutor
            .invoke(&[], &Message::user("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::ComputationFailed(_)));
    }

    #[test]
    fn fragment_wire_shape_is_role_and_content() {
        let fragment = Fragment::assistant("chunk");
        let json = serde_json::to_string(&fragment).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"chunk"}"#);
    }
}

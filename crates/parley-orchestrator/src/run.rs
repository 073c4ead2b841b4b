use crate::error::OrchestratorError;
use crate::stream_runner::{run_reply_stream, ReplyStream};
use crate::RunCancellationToken;
use parley_contract::{
    AgentExecutor, ChatRequest, ChatResponse, Committed, Message, StoreError, ThreadHead,
    ThreadStateStore, VersionPrecondition,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Warning attached to a response whose reply could not be persisted.
pub(crate) const UNPERSISTED_WARNING: &str =
    "reply was not persisted; thread history may diverge on the next call";

/// Per-invocation lifecycle.
///
/// `Failed` never mutates the store; `Completed` and `Cancelled` both
/// attempt a best-effort save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationPhase {
    Pending,
    Resolving,
    Executing,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for InvocationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Resolving => "resolving",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        })
    }
}

/// Resolves a thread id to durable state, drives the executor, persists the
/// result, and shapes it for synchronous or streaming delivery.
///
/// Both collaborators are injected capabilities; the orchestrator holds no
/// mutable state of its own, so one instance serves any number of
/// concurrent requests. Within one thread id the caller contract is at most
/// one concurrent request; a violation is detected as a version conflict at
/// save time, never silently overwritten.
pub struct Orchestrator {
    store: Arc<dyn ThreadStateStore>,
    executor: Arc<dyn AgentExecutor>,
}

impl Orchestrator {
    pub fn new(store: Arc<dyn ThreadStateStore>, executor: Arc<dyn AgentExecutor>) -> Self {
        Self { store, executor }
    }

    /// Run one invocation to completion and return the final reply.
    ///
    /// On success the new user message and the final assistant message are
    /// appended to the thread and saved. If the save fails after a
    /// successful computation the answer is still returned, carrying a
    /// degraded-state warning. The exception is a version conflict, which
    /// is surfaced as [`OrchestratorError::Conflict`] so the caller
    /// re-reads before retrying.
    pub async fn invoke(
        &self,
        request: &ChatRequest,
        cancel: Option<&RunCancellationToken>,
    ) -> Result<ChatResponse, OrchestratorError> {
        debug!(thread_id = %request.thread_id, phase = %InvocationPhase::Pending, "invocation received");
        validate(request)?;

        debug!(thread_id = %request.thread_id, phase = %InvocationPhase::Resolving, "loading thread state");
        let head = self.store.load_or_init(&request.thread_id).await?;
        let input = Message::user(request.message.clone());

        debug!(
            thread_id = %request.thread_id,
            history = head.thread.message_count(),
            phase = %InvocationPhase::Executing,
            "invoking executor"
        );
        let outcome = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => None,
                result = self.executor.invoke(&head.thread.messages, &input) => Some(result),
            },
            None => Some(self.executor.invoke(&head.thread.messages, &input).await),
        };

        let Some(result) = outcome else {
            // Cancelled mid-computation. The synchronous shape has no
            // partial output, so the best-effort save commits the user
            // message only.
            debug!(thread_id = %request.thread_id, phase = %InvocationPhase::Cancelled, "invocation cancelled");
            if let Err(e) = persist_turn(self.store.as_ref(), head, input, None).await {
                warn!(error = %e, thread_id = %request.thread_id, "cancelled turn not persisted");
            }
            return Err(OrchestratorError::Cancelled);
        };

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                // Failed runs never mutate the store.
                debug!(thread_id = %request.thread_id, phase = %InvocationPhase::Failed, error = %e, "executor failed");
                return Err(e.into());
            }
        };

        let thread_id = request.thread_id.clone();
        match persist_turn(self.store.as_ref(), head, input, Some(output.clone())).await {
            Ok(committed) => {
                debug!(
                    %thread_id,
                    version = committed.version,
                    phase = %InvocationPhase::Completed,
                    "turn persisted"
                );
                Ok(ChatResponse {
                    output,
                    thread_id,
                    warning: None,
                })
            }
            Err(StoreError::Conflict { expected, actual }) => {
                Err(OrchestratorError::Conflict { expected, actual })
            }
            Err(e) => {
                // The computed answer is never discarded.
                warn!(error = %e, %thread_id, "reply computed but not persisted; history may diverge on the next call");
                Ok(ChatResponse {
                    output,
                    thread_id,
                    warning: Some(UNPERSISTED_WARNING.to_string()),
                })
            }
        }
    }

    /// Start one streaming invocation.
    ///
    /// Resolution errors (bad request, store down) surface eagerly as the
    /// return value; everything after that is reported in-band on the event
    /// stream, ending with exactly one terminal event. Whatever was
    /// accumulated when the stream ends (naturally or through the returned
    /// cancellation token) is committed best-effort, so a cancelled stream
    /// keeps its partial progress.
    pub async fn stream(
        &self,
        request: &ChatRequest,
        cancellation: RunCancellationToken,
    ) -> Result<ReplyStream, OrchestratorError> {
        debug!(thread_id = %request.thread_id, phase = %InvocationPhase::Pending, "streaming invocation received");
        validate(request)?;

        debug!(thread_id = %request.thread_id, phase = %InvocationPhase::Resolving, "loading thread state");
        let head = self.store.load_or_init(&request.thread_id).await?;
        let run_id = generate_run_id();
        let events = run_reply_stream(
            self.store.clone(),
            self.executor.clone(),
            head,
            Message::user(request.message.clone()),
            run_id.clone(),
            cancellation.clone(),
        );
        Ok(ReplyStream {
            thread_id: request.thread_id.clone(),
            run_id,
            cancellation,
            events,
        })
    }
}

fn generate_run_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

fn validate(request: &ChatRequest) -> Result<(), OrchestratorError> {
    if request.thread_id.trim().is_empty() {
        return Err(OrchestratorError::InvalidRequest(
            "thread_id must not be empty".to_string(),
        ));
    }
    if request.message.trim().is_empty() {
        return Err(OrchestratorError::InvalidRequest(
            "message must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Append the turn's messages to the loaded head and save against the
/// version it was loaded at.
pub(crate) async fn persist_turn(
    store: &dyn ThreadStateStore,
    head: ThreadHead,
    input: Message,
    reply: Option<Message>,
) -> Result<Committed, StoreError> {
    let ThreadHead { mut thread, version } = head;
    thread.push(input);
    if let Some(reply) = reply {
        thread.push(reply);
    }
    store.save(&thread, VersionPrecondition::Exact(version)).await
}

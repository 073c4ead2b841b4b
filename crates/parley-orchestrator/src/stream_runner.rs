use crate::collector::ReplyCollector;
use crate::run::{persist_turn, InvocationPhase};
use crate::RunCancellationToken;
use async_stream::stream;
use futures::{Stream, StreamExt};
use parley_contract::{AgentExecutor, Fragment, Message, ThreadHead, ThreadStateStore};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a streaming invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    NaturalEnd,
    Cancelled,
}

/// Events produced by one streaming invocation, in delivery order: zero or
/// more fragments followed by exactly one terminal event.
#[derive(Debug, Clone)]
pub enum ReplyEvent {
    /// One incremental piece of the reply, in executor emission order.
    Fragment(Fragment),
    /// The stream ended and the best-effort save already ran. `persisted`
    /// is false when that save failed (the answer was still delivered).
    Completed {
        thread_id: String,
        termination: Termination,
        persisted: bool,
    },
    /// The computation failed. The store was not touched.
    Failed { message: String },
}

/// Handle for one streaming invocation.
///
/// Cancelling `cancellation` stops the run at its next suspension point;
/// the stream then commits partial progress and emits its terminal event.
pub struct ReplyStream {
    pub thread_id: String,
    pub run_id: String,
    pub cancellation: RunCancellationToken,
    pub events: Pin<Box<dyn Stream<Item = ReplyEvent> + Send>>,
}

impl std::fmt::Debug for ReplyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyStream")
            .field("thread_id", &self.thread_id)
            .field("run_id", &self.run_id)
            .field("cancellation", &self.cancellation)
            .field("events", &"<stream>")
            .finish()
    }
}

/// Drive the executor's fragment stream, accumulating fragments in order so
/// the assembled (possibly partial) message can be committed on completion
/// or cancellation.
pub(crate) fn run_reply_stream(
    store: Arc<dyn ThreadStateStore>,
    executor: Arc<dyn AgentExecutor>,
    head: ThreadHead,
    input: Message,
    run_id: String,
    cancellation: RunCancellationToken,
) -> Pin<Box<dyn Stream<Item = ReplyEvent> + Send>> {
    Box::pin(stream! {
        let thread_id = head.thread.id.clone();
        debug!(
            %thread_id,
            %run_id,
            history = head.thread.message_count(),
            phase = %InvocationPhase::Executing,
            "starting reply stream"
        );

        let mut fragments = executor.stream(&head.thread.messages, &input);
        let mut collector = ReplyCollector::new();
        let mut termination = Termination::NaturalEnd;

        loop {
            let next = tokio::select! {
                _ = cancellation.cancelled() => {
                    termination = Termination::Cancelled;
                    break;
                }
                fragment = fragments.next() => fragment,
            };
            let Some(fragment) = next else {
                break;
            };
            match fragment {
                Ok(fragment) => {
                    collector.push(&fragment);
                    yield ReplyEvent::Fragment(fragment);
                }
                Err(e) => {
                    // Failed runs never mutate the store.
                    debug!(%thread_id, %run_id, phase = %InvocationPhase::Failed, error = %e, "executor failed mid-stream");
                    yield ReplyEvent::Failed {
                        message: e.to_string(),
                    };
                    return;
                }
            }
        }

        // Close the fragment source before touching the store.
        drop(fragments);

        let phase = match termination {
            Termination::NaturalEnd => InvocationPhase::Completed,
            Termination::Cancelled => InvocationPhase::Cancelled,
        };
        let emitted = collector.fragment_count();
        let reply = collector.finish();
        let persisted = match persist_turn(store.as_ref(), head, input, reply).await {
            Ok(committed) => {
                debug!(
                    %thread_id,
                    %run_id,
                    version = committed.version,
                    fragments = emitted,
                    phase = %phase,
                    "turn persisted"
                );
                true
            }
            Err(e) => {
                warn!(
                    error = %e,
                    %thread_id,
                    %run_id,
                    phase = %phase,
                    "streamed turn not persisted; history may diverge on the next call"
                );
                false
            }
        };
        yield ReplyEvent::Completed {
            thread_id,
            termination,
            persisted,
        };
    })
}

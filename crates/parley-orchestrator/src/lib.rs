//! Invocation orchestration.
//!
//! The orchestrator owns the lifecycle of one invocation: resolve the thread
//! id to its durable state, drive the injected [`AgentExecutor`] to
//! completion (or incrementally), persist the resulting state, and shape the
//! result for synchronous or streaming delivery.
//!
//! ```text
//! request → resolve(thread_id) → execute(state, message) → persist → respond
//! ```
//!
//! [`AgentExecutor`]: parley_contract::AgentExecutor

mod collector;
mod error;
mod run;
mod stream_runner;


pub use collector::ReplyCollector;
pub use error::OrchestratorError;
pub use run::{InvocationPhase, Orchestrator};
pub use stream_runner::{ReplyEvent, ReplyStream, Termination};

/// Cancellation signal for a running invocation. Supplied externally (the
/// transport layer, a timeout wrapper); observed at every suspension point.
pub type RunCancellationToken = tokio_util::sync::CancellationToken;

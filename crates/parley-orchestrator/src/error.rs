use parley_contract::{ExecutionError, StoreError, Version};
use thiserror::Error;

/// Orchestration errors.
///
/// Everything internal is caught at the store and executor boundaries and
/// converted here before it crosses into a transport; nothing leaks
/// unclassified.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Bad or missing thread id / message. Caller error; retrying without
    /// fixing the input will not help.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The agent computation failed internally. May be transient; retry
    /// with backoff is reasonable.
    #[error("computation failed: {0}")]
    ComputationFailed(String),

    /// The state store backend is down. Retryable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A conflicting concurrent write to the same thread was detected.
    /// The caller should re-read and retry.
    #[error("conflicting write on thread: expected version {expected}, found {actual}")]
    Conflict { expected: Version, actual: Version },

    /// Client-initiated cancellation. Not an error to log loudly.
    #[error("invocation cancelled")]
    Cancelled,
}

impl From<StoreError> for OrchestratorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict { expected, actual } => Self::Conflict { expected, actual },
            StoreError::InvalidId(msg) => Self::InvalidRequest(msg),
            StoreError::Unavailable(msg) => Self::Unavailable(msg),
            StoreError::Serialization(msg) => Self::Unavailable(msg),
        }
    }
}

impl From<ExecutionError> for OrchestratorError {
    fn from(e: ExecutionError) -> Self {
        match e {
            ExecutionError::ComputationFailed(msg) => Self::ComputationFailed(msg),
        }
    }
}

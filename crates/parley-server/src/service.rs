use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parley_contract::ThreadStateStore;
use parley_orchestrator::{Orchestrator, OrchestratorError};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn ThreadStateStore>,
}

/// API-surface errors with kind-appropriate status codes.
///
/// Each orchestrator error kind keeps its own status class instead of
/// collapsing everything to 500, so callers can tell retryable failures
/// from caller errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("thread not found: {0}")]
    ThreadNotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::ThreadNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Unavailable(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };
        let body = Json(serde_json::json!({ "error": msg }));
        (code, body).into_response()
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        match e {
            OrchestratorError::InvalidRequest(_) => ApiError::BadRequest(e.to_string()),
            OrchestratorError::Conflict { .. } => ApiError::Conflict(e.to_string()),
            OrchestratorError::Unavailable(_) => ApiError::Unavailable(e.to_string()),
            OrchestratorError::ComputationFailed(_) | OrchestratorError::Cancelled => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

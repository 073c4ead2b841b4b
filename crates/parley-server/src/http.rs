use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parley_contract::{ChatRequest, ChatResponse, Thread, ThreadStateStore};
use parley_orchestrator::RunCancellationToken;

use crate::service::{ApiError, AppState};
use crate::sse;

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";
/// Synchronous invocation endpoint path.
pub const INVOKE_PATH: &str = "/invoke";
/// Streaming (SSE) invocation endpoint path.
pub const STREAM_SSE_PATH: &str = "/stream-sse";
/// Thread list endpoint path.
pub const THREADS_PATH: &str = "/v1/threads";
/// Thread detail endpoint path.
pub const THREAD_PATH: &str = "/v1/threads/{id}";

/// Build health routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route(HEALTH_PATH, get(health))
}

/// Build invocation routes.
pub fn invoke_routes() -> Router<AppState> {
    Router::new()
        .route(INVOKE_PATH, post(invoke))
        .route(STREAM_SSE_PATH, post(stream_sse))
}

/// Build thread inspection/cleanup routes.
pub fn thread_routes() -> Router<AppState> {
    Router::new()
        .route(THREADS_PATH, get(list_threads))
        .route(THREAD_PATH, get(get_thread).delete(delete_thread))
}

/// The full router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(invoke_routes())
        .merge(thread_routes())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn invoke(
    State(st): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = st.orchestrator.invoke(&request, None).await?;
    Ok(Json(response))
}

async fn stream_sse(
    State(st): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let run = st
        .orchestrator
        .stream(&request, RunCancellationToken::new())
        .await?;
    let rx = sse::relay_reply_stream(run);
    Ok(sse::sse_response(sse::sse_body_stream(rx)))
}

async fn list_threads(State(st): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    st.store
        .list()
        .await
        .map(Json)
        .map_err(|e| ApiError::Internal(e.to_string()))
}

async fn get_thread(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Thread>, ApiError> {
    let Some(head) = st
        .store
        .load(&id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    else {
        return Err(ApiError::ThreadNotFound(id));
    };
    Ok(Json(head.thread))
}

async fn delete_thread(
    State(st): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    st.store
        .delete(&id)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(StatusCode::NO_CONTENT)
}

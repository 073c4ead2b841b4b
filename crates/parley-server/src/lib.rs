//! HTTP surface for the invocation orchestrator.
//!
//! Thin by design: handlers deserialize requests, call the orchestrator,
//! and serialize `ChatResponse` / SSE events. The interesting part is
//! [`sse`], the delivery adapter that turns a reply stream into a
//! transport-level event stream with disconnect propagation.

pub mod http;
pub mod service;
pub mod sse;

pub use http::router;
pub use service::{ApiError, AppState};

//! Stream delivery adapter: reply events out, SSE frames in order.
//!
//! One transport event per fragment plus exactly one terminal event, in the
//! order the orchestrator produced them. On client disconnect the adapter
//! cancels the run's token and keeps draining the reply stream so the
//! orchestrator's best-effort partial save still runs; fragments are never
//! produced into a void, and partial progress is not lost.

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::StreamExt;
use parley_orchestrator::{ReplyEvent, ReplyStream, Termination};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tracing::debug;

/// Frame one named SSE event.
fn frame(event: &str, data: &serde_json::Value) -> Bytes {
    Bytes::from(format!("event: {event}\ndata: {data}\n\n"))
}

/// Encode one reply event as an SSE frame.
///
/// Fragments keep the `event: data` / `{role, content}` wire shape; the
/// terminal frame is `end` (with the termination reason and whether the
/// turn was persisted) or `error`, so clients can tell "done" from
/// "failed" without guessing at an abrupt close.
pub(crate) fn encode_event(event: &ReplyEvent) -> Bytes {
    match event {
        ReplyEvent::Fragment(fragment) => frame(
            "data",
            &serde_json::json!({
                "role": fragment.role,
                "content": fragment.content,
            }),
        ),
        ReplyEvent::Completed {
            thread_id,
            termination,
            persisted,
        } => frame(
            "end",
            &serde_json::json!({
                "thread_id": thread_id,
                "reason": match termination {
                    Termination::NaturalEnd => "completed",
                    Termination::Cancelled => "cancelled",
                },
                "persisted": persisted,
            }),
        ),
        ReplyEvent::Failed { message } => frame(
            "error",
            &serde_json::json!({ "message": message }),
        ),
    }
}

/// Pump a reply stream into an SSE byte channel.
///
/// Returns the receiver to feed into the HTTP response body. The pump task
/// outlives the response: when the receiver is dropped (client gone) it
/// cancels the run and drains the remaining events so the terminal
/// partial-save path completes.
pub fn relay_reply_stream(run: ReplyStream) -> mpsc::Receiver<Bytes> {
    let (tx, rx) = mpsc::channel::<Bytes>(64);
    let ReplyStream {
        thread_id,
        run_id,
        cancellation,
        mut events,
    } = run;
    tokio::spawn(async move {
        let mut disconnected = false;
        while let Some(event) = events.next().await {
            if disconnected {
                continue;
            }
            if tx.send(encode_event(&event)).await.is_err() {
                debug!(%thread_id, %run_id, "sse client disconnected, cancelling run");
                disconnected = true;
                cancellation.cancel();
            }
        }
    });
    rx
}

pub fn sse_body_stream(
    mut rx: mpsc::Receiver<Bytes>,
) -> impl futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        while let Some(chunk) = rx.recv().await {
            yield Ok::<Bytes, Infallible>(chunk);
        }
    }
}

pub fn sse_response<S>(stream: S) -> Response
where
    S: futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    (headers, Body::from_stream(stream)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_contract::Fragment;

    #[test]
    fn fragment_frames_keep_the_observed_wire_shape() {
        let chunk = encode_event(&ReplyEvent::Fragment(Fragment::assistant("Hel")));
        assert_eq!(
            chunk,
            Bytes::from("event: data\ndata: {\"content\":\"Hel\",\"role\":\"assistant\"}\n\n")
        );
    }

    #[test]
    fn terminal_frames_distinguish_done_from_failed() {
        let done = encode_event(&ReplyEvent::Completed {
            thread_id: "t1".to_string(),
            termination: Termination::Cancelled,
            persisted: true,
        });
        let done = String::from_utf8(done.to_vec()).unwrap();
        assert!(done.starts_with("event: end\n"));
        assert!(done.contains("\"reason\":\"cancelled\""));
        assert!(done.contains("\"persisted\":true"));

        let failed = encode_event(&ReplyEvent::Failed {
            message: "boom".to_string(),
        });
        let failed = String::from_utf8(failed.to_vec()).unwrap();
        assert!(failed.starts_with("event: error\n"));
        assert!(failed.contains("\"message\":\"boom\""));
    }

    #[tokio::test]
    async fn sse_body_stream_yields_all_chunks() {
        let (tx, rx) = mpsc::channel::<Bytes>(4);
        let stream = sse_body_stream(rx);
        tokio::pin!(stream);

        tx.send(Bytes::from("a")).await.unwrap();
        tx.send(Bytes::from("b")).await.unwrap();
        drop(tx);

        let items: Vec<Bytes> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(items, vec![Bytes::from("a"), Bytes::from("b")]);
    }

    #[tokio::test]
    async fn dropped_receiver_cancels_the_run_and_keeps_draining() {
        use parley_orchestrator::RunCancellationToken;

        let cancellation = RunCancellationToken::new();
        let token = cancellation.clone();
        // A stream that only ends once the relay has propagated cancellation.
        let events = Box::pin(async_stream::stream! {
            yield ReplyEvent::Fragment(Fragment::assistant("one"));
            token.cancelled().await;
            yield ReplyEvent::Completed {
                thread_id: "t1".to_string(),
                termination: Termination::Cancelled,
                persisted: true,
            };
        });
        let run = ReplyStream {
            thread_id: "t1".to_string(),
            run_id: "r1".to_string(),
            cancellation: cancellation.clone(),
            events,
        };

        let rx = relay_reply_stream(run);
        drop(rx);

        // The relay notices the closed channel on its next send and cancels.
        cancellation.cancelled().await;
    }
}

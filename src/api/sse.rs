//! Server-Sent Events support
//!
//! The only place reply frames are encoded for the wire.

use crate::emitter::FrameStream;
use crate::protocol::{ContentBody, ErrorBody, FrameMode, FRAME_MODE_HEADER};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, StreamExt};
use std::time::Duration;

/// Shown in place of provider detail when a stream fails
pub const STREAM_FAILURE_MESSAGE: &str =
    "I apologize, but I encountered an error while processing your request.";

/// Convert a frame stream to an SSE response advertising its frame mode.
///
/// A provider error becomes a final `error` event. Dropping the response
/// body (client gone) drops the frame stream and the provider body with it.
pub fn frame_response(mode: FrameMode, frames: FrameStream) -> Response {
    let events = stream::unfold(Some((frames, StreamGuard::default())), |state| async move {
        let (mut frames, mut guard) = state?;
        match frames.next().await {
            Some(Ok(frame)) => {
                guard.frames += 1;
                Some((frame_event(frame.payload), Some((frames, guard))))
            }
            Some(Err(e)) => {
                guard.finished = true;
                tracing::error!(
                    error = %e.message,
                    kind = ?e.kind,
                    frames = guard.frames,
                    "Provider failed mid-stream"
                );
                Some((error_event(STREAM_FAILURE_MESSAGE), None))
            }
            None => {
                guard.finished = true;
                None
            }
        }
    });

    let sse = Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    );
    ([(FRAME_MODE_HEADER, mode.as_str())], sse).into_response()
}

fn frame_event(content: String) -> Result<Event, axum::Error> {
    Event::default().json_data(ContentBody { content })
}

fn error_event(message: &str) -> Result<Event, axum::Error> {
    Event::default().event("error").json_data(ErrorBody::new(message))
}

#[derive(Default)]
struct StreamGuard {
    frames: usize,
    finished: bool,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.finished {
            tracing::debug!(frames = self.frames, "Reply stream closed");
        } else {
            tracing::info!(frames = self.frames, "Client disconnected mid-stream");
        }
    }
}

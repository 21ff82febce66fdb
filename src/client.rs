//! Widget-side HTTP client
//!
//! Sends one user message to the chat API and feeds the reply into an
//! [`Assembler`]. Transport and server failures never surface as errors
//! here; they finalize the assistant turn as errored, which is what the
//! user sees.

use crate::api::{ChatRequest, ChatResponse, ErrorResponse};
use crate::assembler::{Assembler, SubmitError, Transcript};
use crate::protocol::{DecodeError, FrameDecoder, FrameMode, WireEvent, FRAME_MODE_HEADER};
use futures::StreamExt;
use reqwest::{Client, Response};
use std::time::Duration;
use thiserror::Error;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error("failed to create HTTP client: {0}")]
    Build(String),
}

pub struct ChatClient {
    http: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send `text` and apply the whole reply at once.
    pub async fn send(&self, assembler: &mut Assembler, text: &str) -> Result<(), ClientError> {
        let request = ChatRequest::new(assembler.submit_user_text(text)?.text.clone());

        let result = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await;
        let response = match result {
            Ok(response) => response,
            Err(e) => {
                assembler.on_stream_error(e);
                return Ok(());
            }
        };

        if !response.status().is_success() {
            let reason = failure_reason(response).await;
            assembler.on_stream_error(reason);
            return Ok(());
        }

        match response.json::<ChatResponse>().await {
            Ok(body) => {
                assembler.on_complete_reply(body.content);
            }
            Err(e) => {
                assembler.on_stream_error(e);
            }
        }
        Ok(())
    }

    /// Send `text` and apply the reply frame by frame, calling `on_update`
    /// after every change to the transcript.
    pub async fn send_streaming(
        &self,
        assembler: &mut Assembler,
        text: &str,
        mut on_update: impl FnMut(&Transcript),
    ) -> Result<(), ClientError> {
        let request = ChatRequest::new(assembler.submit_user_text(text)?.text.clone());
        on_update(assembler.transcript());

        let result = self
            .http
            .post(format!("{}/api/chat/stream", self.base_url))
            .header("accept", "text/event-stream")
            .json(&request)
            .send()
            .await;
        let response = match result {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                let reason = failure_reason(response).await;
                assembler.on_stream_error(reason);
                on_update(assembler.transcript());
                return Ok(());
            }
            Err(e) => {
                assembler.on_stream_error(e);
                on_update(assembler.transcript());
                return Ok(());
            }
        };

        let mode = frame_mode(&response);
        tracing::debug!(%mode, "Reading reply stream");
        let mut decoder = FrameDecoder::new(mode);
        let mut body = Box::pin(response.bytes_stream());

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in decoder.push(&bytes) {
                        let more = apply(assembler, event);
                        on_update(assembler.transcript());
                        if !more {
                            return Ok(());
                        }
                    }
                }
                Err(e) => {
                    assembler.on_stream_error(e);
                    on_update(assembler.transcript());
                    return Ok(());
                }
            }
        }

        if let Some(event) = decoder.finish() {
            if !apply(assembler, event) {
                on_update(assembler.transcript());
                return Ok(());
            }
        }
        assembler.on_stream_end();
        on_update(assembler.transcript());
        Ok(())
    }
}

/// Returns false once the stream has reported a failure.
fn apply(assembler: &mut Assembler, event: Result<WireEvent, DecodeError>) -> bool {
    match event {
        Ok(WireEvent::Frame(frame)) => {
            assembler.on_frame(Ok(frame));
            true
        }
        Ok(WireEvent::Error(message)) => {
            assembler.on_stream_error(message);
            false
        }
        Err(e) => {
            assembler.on_frame(Err(e));
            true
        }
    }
}

/// Frame mode advertised by the server; delta when absent or unknown
fn frame_mode(response: &Response) -> FrameMode {
    response
        .headers()
        .get(FRAME_MODE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .unwrap_or_default()
}

async fn failure_reason(response: Response) -> String {
    let status = response.status();
    match response.json::<ErrorResponse>().await {
        Ok(body) => format!("HTTP {status}: {}", body.error),
        Err(_) => format!("HTTP {status}"),
    }
}

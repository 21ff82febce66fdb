//! Incremental SSE decoding
//!
//! Bytes arrive in arbitrary chunks; a chunk boundary may fall anywhere,
//! including inside a multi-byte UTF-8 sequence. Lines are only decoded once
//! their terminating `\n` has arrived, so a split character is never seen.

use super::frame::{ErrorBody, Frame, FrameMode};
use serde_json::Value;
use thiserror::Error;

/// A frame that could not be turned into text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("frame is not valid UTF-8")]
    InvalidUtf8,
    #[error("frame data is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("frame data has no string `content` field")]
    MissingContent,
}

/// One dispatched server-sent event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any
    pub event: Option<String>,
    /// `data:` lines joined with `\n`
    pub data: String,
}

/// Splits a byte stream into server-sent events.
#[derive(Debug, Default)]
pub struct EventBuffer {
    pending: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    poisoned: bool,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<SseEvent, DecodeError>> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(event) = self.process_line(line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush at transport close. A trailing event without its blank line is
    /// still dispatched; an unterminated partial line is decoded as-is.
    pub fn finish(&mut self) -> Option<Result<SseEvent, DecodeError>> {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            if let Some(event) = self.process_line(line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: Vec<u8>) -> Option<Result<SseEvent, DecodeError>> {
        if line.is_empty() {
            return self.dispatch();
        }

        let Ok(line) = String::from_utf8(line) else {
            self.poisoned = true;
            return None;
        };

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_str(), ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            // id, retry and unknown fields carry nothing we use
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<Result<SseEvent, DecodeError>> {
        let event = self.event.take();
        let data = std::mem::take(&mut self.data);

        if std::mem::take(&mut self.poisoned) {
            return Some(Err(DecodeError::InvalidUtf8));
        }
        if data.is_empty() {
            return None;
        }
        Some(Ok(SseEvent {
            event,
            data: data.join("\n"),
        }))
    }
}

/// A decoded unit of the reply stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    Frame(Frame),
    /// The emitter reported an upstream failure; no frames follow
    Error(String),
}

/// Turns reply-stream bytes into frames of a fixed mode.
#[derive(Debug)]
pub struct FrameDecoder {
    events: EventBuffer,
    mode: FrameMode,
}

impl FrameDecoder {
    pub fn new(mode: FrameMode) -> Self {
        Self {
            events: EventBuffer::new(),
            mode,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<WireEvent, DecodeError>> {
        let mode = self.mode;
        self.events
            .push(chunk)
            .into_iter()
            .filter_map(|event| event.and_then(|e| interpret(e, mode)).transpose())
            .collect()
    }

    pub fn finish(&mut self) -> Option<Result<WireEvent, DecodeError>> {
        let mode = self.mode;
        self.events
            .finish()
            .and_then(|event| event.and_then(|e| interpret(e, mode)).transpose())
    }
}

fn interpret(event: SseEvent, mode: FrameMode) -> Result<Option<WireEvent>, DecodeError> {
    match event.event.as_deref() {
        None | Some("message") => {
            let value: Value = serde_json::from_str(&event.data)
                .map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
            let payload = value
                .get("content")
                .and_then(Value::as_str)
                .ok_or(DecodeError::MissingContent)?;
            Ok(Some(WireEvent::Frame(Frame {
                payload: payload.to_string(),
                mode,
            })))
        }
        Some("error") => {
            let message = serde_json::from_str::<ErrorBody>(&event.data)
                .map_or(event.data, |body| body.error);
            Ok(Some(WireEvent::Error(message)))
        }
        Some(_) => Ok(None),
    }
}

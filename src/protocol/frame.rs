//! Frame types and the JSON bodies they travel in

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Response header advertising how the frames of a stream must be applied
pub const FRAME_MODE_HEADER: &str = "x-frame-mode";

/// How a frame's payload relates to the text already received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameMode {
    /// Payload is newly produced text, appended to the open turn
    #[default]
    Delta,
    /// Payload is the full text so far, replacing the open turn's text
    Snapshot,
}

impl FrameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FrameMode::Delta => "delta",
            FrameMode::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for FrameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown frame mode `{0}` (expected `delta` or `snapshot`)")]
pub struct UnknownFrameMode(pub String);

impl FromStr for FrameMode {
    type Err = UnknownFrameMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delta" => Ok(FrameMode::Delta),
            "snapshot" => Ok(FrameMode::Snapshot),
            other => Err(UnknownFrameMode(other.to_string())),
        }
    }
}

/// One unit of emitted reply text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: String,
    pub mode: FrameMode,
}

impl Frame {
    pub fn delta(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            mode: FrameMode::Delta,
        }
    }

    pub fn snapshot(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            mode: FrameMode::Snapshot,
        }
    }
}

/// `{"content": ...}`: a frame's data line, and the non-streaming reply body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBody {
    pub content: String,
}

/// `{"error": ...}`: failure body for both reply shapes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bodies_serialize_to_wire_keys() {
        let content = serde_json::to_string(&ContentBody {
            content: "line one\nline two".to_string(),
        })
        .unwrap();
        assert_eq!(content, "{\"content\":\"line one\\nline two\"}");
        assert_eq!(
            serde_json::to_string(&ErrorBody::new("boom")).unwrap(),
            "{\"error\":\"boom\"}"
        );
    }

    #[test]
    fn test_frame_mode_parse() {
        assert_eq!("delta".parse::<FrameMode>(), Ok(FrameMode::Delta));
        assert_eq!(" Snapshot ".parse::<FrameMode>(), Ok(FrameMode::Snapshot));
        assert!("cumulative".parse::<FrameMode>().is_err());
    }

    #[test]
    fn test_frame_mode_default_is_delta() {
        assert_eq!(FrameMode::default(), FrameMode::Delta);
    }
}

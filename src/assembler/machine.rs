//! Reply assembly state machine
//!
//! `Idle` -> `AwaitingReply` (user turn appended, request in flight)
//! -> `Streaming` (assistant turn open) -> `Idle` (assistant turn finalized).

use super::observer::{AssemblyObserver, TracingObserver};
use super::transcript::{Transcript, Turn, TurnStatus};
use crate::protocol::{DecodeError, Frame, FrameMode};
use std::fmt;
use thiserror::Error;

/// Note shown in place of (or after) a reply that failed
pub const ERROR_NOTE: &str = "Sorry, there was an error processing your request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No reply in flight; a user message may be submitted
    Idle,
    /// Request sent, no frame received yet
    AwaitingReply,
    /// Assistant turn open and accumulating
    Streaming,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Idle => "idle",
            Phase::AwaitingReply => "awaiting_reply",
            Phase::Streaming => "streaming",
        })
    }
}

/// A second message was submitted while a reply is still in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("a reply is still in flight ({phase}), wait for it to finish")]
pub struct SequenceError {
    pub phase: Phase,
}

/// Why a user message was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("message is empty")]
    InvalidInput,
    #[error(transparent)]
    Sequence(#[from] SequenceError),
}

/// Effect of applying one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The open turn's text changed
    Applied,
    /// The frame was valid but left the text as it was (repeated snapshot, empty delta)
    Unchanged,
    Dropped(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The frame could not be decoded
    Malformed,
    /// No reply is in flight; the turn it belonged to is already final
    NoReplyInFlight,
}

/// Owns a transcript and applies the reply protocol to it
pub struct Assembler {
    transcript: Transcript,
    phase: Phase,
    observer: Box<dyn AssemblyObserver>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Assembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assembler")
            .field("transcript", &self.transcript)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl Assembler {
    pub fn new() -> Self {
        Self::with_observer(TracingObserver)
    }

    pub fn with_observer(observer: impl AssemblyObserver + 'static) -> Self {
        Self {
            transcript: Transcript::new(),
            phase: Phase::Idle,
            observer: Box::new(observer),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    /// Append the user's message and mark a reply as in flight.
    ///
    /// Rejected without touching the transcript when the text is blank or a
    /// reply is still in flight.
    pub fn submit_user_text(&mut self, text: &str) -> Result<&Turn, SubmitError> {
        if self.phase != Phase::Idle {
            return Err(SequenceError { phase: self.phase }.into());
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(SubmitError::InvalidInput);
        }

        self.phase = Phase::AwaitingReply;
        tracing::debug!(conversation = %self.transcript.id(), "User turn submitted");
        Ok(self.transcript.push_user(text.to_string()))
    }

    /// Apply one decoded (or undecodable) frame to the open reply.
    pub fn on_frame(&mut self, frame: Result<Frame, DecodeError>) -> FrameOutcome {
        if self.phase == Phase::Idle {
            tracing::debug!(
                conversation = %self.transcript.id(),
                "Dropping frame with no reply in flight"
            );
            return FrameOutcome::Dropped(DropReason::NoReplyInFlight);
        }

        let frame = match frame {
            Ok(frame) => frame,
            Err(error) => {
                self.observer.frame_dropped(self.transcript.id(), &error);
                return FrameOutcome::Dropped(DropReason::Malformed);
            }
        };

        let turn = self.open_turn();
        match frame.mode {
            FrameMode::Snapshot if turn.text == frame.payload => FrameOutcome::Unchanged,
            FrameMode::Snapshot => {
                turn.text = frame.payload;
                FrameOutcome::Applied
            }
            FrameMode::Delta if frame.payload.is_empty() => FrameOutcome::Unchanged,
            FrameMode::Delta => {
                turn.text.push_str(&frame.payload);
                FrameOutcome::Applied
            }
        }
    }

    /// Finalize the reply. With zero frames received this finalizes an empty
    /// assistant turn. Returns `None` when no reply was in flight.
    pub fn on_stream_end(&mut self) -> Option<&Turn> {
        if self.phase == Phase::Idle {
            return None;
        }
        self.finalize(TurnStatus::Complete)
    }

    /// Finalize the reply after a failure, keeping any partial text.
    pub fn on_stream_error(&mut self, error: impl fmt::Display) -> Option<&Turn> {
        if self.phase == Phase::Idle {
            return None;
        }
        self.observer
            .stream_failed(self.transcript.id(), &error.to_string());
        self.finalize(TurnStatus::Errored {
            note: ERROR_NOTE.to_string(),
        })
    }

    /// Apply a non-streaming reply: the whole text arrives at once.
    pub fn on_complete_reply(&mut self, text: String) -> Option<&Turn> {
        if self.phase == Phase::Idle {
            return None;
        }
        self.on_frame(Ok(Frame::snapshot(text)));
        self.on_stream_end()
    }

    fn open_turn(&mut self) -> &mut Turn {
        self.phase = Phase::Streaming;
        self.transcript.ensure_open_assistant()
    }

    fn finalize(&mut self, status: TurnStatus) -> Option<&Turn> {
        self.phase = Phase::Idle;
        let conversation = self.transcript.id();
        let turn = self.transcript.ensure_open_assistant();
        turn.status = status;
        tracing::debug!(
            %conversation,
            sequence = turn.sequence,
            chars = turn.text.chars().count(),
            errored = turn.is_errored(),
            "Reply finalized"
        );
        Some(&*turn)
    }
}

//! Client-side reply assembly
//!
//! The [`Assembler`] owns a conversation's [`Transcript`] and merges the
//! emitter's frames into it. It is a plain state machine driven by method
//! calls; rendering only ever observes the transcript.

mod machine;
mod observer;
pub mod transcript;

#[cfg(test)]
mod proptests;

pub use machine::{Assembler, DropReason, FrameOutcome, Phase, SequenceError, SubmitError, ERROR_NOTE};
pub use observer::{AssemblyObserver, TracingObserver};
pub use transcript::{Role, Transcript, Turn, TurnStatus};

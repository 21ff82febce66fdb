//! Wire protocol shared by the emitter and the widget
//!
//! Frames travel as server-sent events: a `data: ` line carrying
//! `{"content": <string>}`, terminated by a blank line. Transport close ends
//! the stream; a provider failure mid-stream is sent as an `error` event.

mod decoder;
mod frame;

pub use decoder::{DecodeError, EventBuffer, FrameDecoder, SseEvent, WireEvent};
pub use frame::{ContentBody, ErrorBody, Frame, FrameMode, UnknownFrameMode, FRAME_MODE_HEADER};

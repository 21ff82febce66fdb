//! Observability hooks for reply assembly

use crate::protocol::DecodeError;
use uuid::Uuid;

/// Receives the failures the assembler absorbs instead of propagating.
pub trait AssemblyObserver: Send {
    /// A frame could not be decoded and was dropped.
    fn frame_dropped(&self, conversation: Uuid, error: &DecodeError);

    /// A reply ended with an upstream or transport failure.
    fn stream_failed(&self, conversation: Uuid, message: &str) {
        let _ = (conversation, message);
    }
}

/// Default observer: structured log records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl AssemblyObserver for TracingObserver {
    fn frame_dropped(&self, conversation: Uuid, error: &DecodeError) {
        tracing::warn!(%conversation, error = %error, "Dropped malformed frame");
    }

    fn stream_failed(&self, conversation: Uuid, message: &str) {
        tracing::error!(%conversation, error = %message, "Reply stream failed");
    }
}

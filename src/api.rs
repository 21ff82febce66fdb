//! HTTP API for the chat widget

mod handlers;
mod sse;
mod types;

#[cfg(test)]
mod proptests;

pub use handlers::create_router;
pub use types::*;

use crate::emitter::Emitter;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub emitter: Arc<Emitter>,
}

impl AppState {
    pub fn new(emitter: Emitter) -> Self {
        Self {
            emitter: Arc::new(emitter),
        }
    }
}

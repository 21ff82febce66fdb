//! API request and response types

use serde::{Deserialize, Serialize};

pub use crate::protocol::{ContentBody as ChatResponse, ErrorBody as ErrorResponse};

/// Request to send a chat message
///
/// The older `{"messages": [...]}` body is not accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatRequest {
    pub message: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

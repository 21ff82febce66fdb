//! LLM provider abstraction
//!
//! Provides a common interface for the hosted models the emitter talks to.

mod anthropic;
mod bedrock;
mod error;
mod registry;
mod types;

#[cfg(test)]
pub mod testing;

pub use anthropic::AnthropicService;
pub use bedrock::BedrockService;
pub use error::{LlmError, LlmErrorKind};
pub use registry::{connect, LlmConfig, ProviderKind};
pub use types::*;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::Arc;

/// Lazy, finite sequence of reply fragments
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

/// Common interface for LLM providers
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Stream the reply as text fragments.
    ///
    /// Providers without native streaming fall back to completing the
    /// request and splitting the reply into words.
    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        let response = self.complete(request).await?;
        Ok(fragment_stream(&response.text))
    }

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Split a complete reply into word fragments whose concatenation is the
/// reply itself (each fragment keeps its trailing space).
pub fn split_fragments(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

/// Simulated stream over a complete reply
pub fn fragment_stream(text: &str) -> TextStream {
    stream::iter(split_fragments(text).into_iter().map(Ok)).boxed()
}

/// Logging wrapper for LLM services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    model_id: String,
}

impl LoggingService {
    pub fn new(inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "LLM request failed"
                );
            }
        }

        result
    }

    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.stream(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    "LLM stream opened"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "LLM stream failed to open"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

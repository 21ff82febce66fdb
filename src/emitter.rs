//! Server-side reply emitter
//!
//! Validates one user message, makes exactly one provider call, and hands
//! the reply back either whole or as a lazy stream of frames in the
//! deployment's frame mode.

use crate::config::EmitterConfig;
use crate::llm::{LlmError, LlmRequest, LlmService};
use crate::protocol::{Frame, FrameMode};
use futures::future;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use std::sync::Arc;
use thiserror::Error;

/// Frames for one reply. Ends after the last fragment, or right after the
/// first error.
pub type FrameStream = BoxStream<'static, Result<Frame, LlmError>>;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("message must not be empty")]
    InvalidInput,
    #[error("upstream provider failed: {0}")]
    Upstream(#[from] LlmError),
}

/// Stateless; shared across handlers behind an `Arc`
pub struct Emitter {
    service: Arc<dyn LlmService>,
    settings: EmitterConfig,
}

impl Emitter {
    pub fn new(service: Arc<dyn LlmService>, settings: EmitterConfig) -> Self {
        Self { service, settings }
    }

    pub fn frame_mode(&self) -> FrameMode {
        self.settings.frame_mode
    }

    /// Full reply text for a non-streaming request.
    pub async fn reply(&self, text: &str) -> Result<String, EmitError> {
        let request = self.build_request(text)?;
        let response = self.service.complete(&request).await?;
        tracing::debug!(chars = response.text.len(), "Reply emitted");
        Ok(response.text)
    }

    /// Open the provider stream and map its fragments to frames.
    ///
    /// A provider failure before the first fragment is returned as an
    /// error here; later failures arrive as the stream's final item.
    pub async fn stream(&self, text: &str) -> Result<FrameStream, EmitError> {
        let request = self.build_request(text)?;
        let fragments = self.service.stream(&request).await?;
        let mode = self.settings.frame_mode;

        let frames = fragments
            .try_filter(|fragment| future::ready(!fragment.is_empty()))
            .scan(
                (String::new(), false),
                move |state: &mut (String, bool), item: Result<String, LlmError>| {
                    let (text, failed) = state;
                    if *failed {
                        return future::ready(None);
                    }
                    let frame = match item {
                        Ok(fragment) => Ok(match mode {
                            FrameMode::Delta => Frame::delta(fragment),
                            FrameMode::Snapshot => {
                                text.push_str(&fragment);
                                Frame::snapshot(text.clone())
                            }
                        }),
                        Err(e) => {
                            *failed = true;
                            Err(e)
                        }
                    };
                    future::ready(Some(frame))
                },
            );

        Ok(match self.settings.stream_delay {
            Some(delay) => frames
                .then(move |frame| async move {
                    tokio::time::sleep(delay).await;
                    frame
                })
                .boxed(),
            None => frames.boxed(),
        })
    }

    fn build_request(&self, text: &str) -> Result<LlmRequest, EmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EmitError::InvalidInput);
        }
        Ok(LlmRequest {
            system: Some(self.settings.system_prompt.clone()),
            prompt: text.to_string(),
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
        })
    }
}

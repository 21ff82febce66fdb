//! Anthropic Claude provider implementation

use super::types::{LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService, TextStream};
use crate::protocol::{EventBuffer, SseEvent};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Anthropic service implementation
pub struct AnthropicService {
    client: Client,
    api_key: String,
    base_url: String,
    model_id: String,
}

impl AnthropicService {
    pub fn new(api_key: String, model: &str, gateway: Option<&str>) -> Result<Self, LlmError> {
        let base_url = match gateway {
            Some(gw) => format!("{}/_/gateway/anthropic/v1/messages", gw.trim_end_matches('/')),
            None => "https://api.anthropic.com/v1/messages".to_string(),
        };

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model_id: model.to_string(),
        })
    }

    fn translate_request(&self, request: &LlmRequest, stream: bool) -> AnthropicRequest {
        AnthropicRequest {
            model: self.model_id.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.clone(),
            messages: vec![user_message(&request.prompt)],
            stream,
        }
    }

    async fn send(&self, request: &LlmRequest, stream: bool) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&self.translate_request(request, stream))
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, &body));
        }
        Ok(response)
    }
}

#[async_trait]
impl LlmService for AnthropicService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let response = self.send(request, false).await?;
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        let anthropic_response: AnthropicResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        Ok(normalize_response(anthropic_response, ""))
    }

    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        let response = self.send(request, true).await?;
        Ok(text_deltas(Box::pin(response.bytes_stream())))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

pub(super) fn user_message(text: &str) -> AnthropicMessage {
    AnthropicMessage {
        role: "user",
        content: vec![AnthropicContentBlock::Text {
            text: text.to_string(),
        }],
    }
}

/// Collapse a messages-API response into plain text. Text blocks are joined
/// with `separator`.
pub(super) fn normalize_response(resp: AnthropicResponse, separator: &str) -> LlmResponse {
    let text = resp
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(text),
            AnthropicContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join(separator);

    LlmResponse {
        text,
        usage: Usage {
            input_tokens: resp.usage.input_tokens,
            output_tokens: resp.usage.output_tokens,
        },
    }
}

/// Decode a streaming messages-API body into its text deltas.
///
/// The stream ends at `message_stop` or transport close; an `error` event or
/// a transport failure yields one error and ends it.
fn text_deltas<S, B>(body: S) -> TextStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = DeltaState {
        body,
        events: EventBuffer::new(),
        ready: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(item) = st.ready.pop_front() {
                if item.is_err() {
                    st.ready.clear();
                    st.finished = true;
                }
                return Some((item, st));
            }
            if st.finished {
                return None;
            }
            match st.body.next().await {
                Some(Ok(chunk)) => {
                    for event in st.events.push(chunk.as_ref()) {
                        st.absorb(event);
                    }
                }
                Some(Err(e)) => {
                    st.ready
                        .push_back(Err(LlmError::network(format!("Stream read error: {e}"))));
                }
                None => {
                    if let Some(event) = st.events.finish() {
                        st.absorb(event);
                    }
                    st.finished = true;
                }
            }
        }
    })
    .boxed()
}

struct DeltaState<S> {
    body: S,
    events: EventBuffer,
    ready: VecDeque<Result<String, LlmError>>,
    finished: bool,
}

impl<S> DeltaState<S> {
    fn absorb(&mut self, event: Result<SseEvent, crate::protocol::DecodeError>) {
        if self.finished {
            return;
        }
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping undecodable provider event");
                return;
            }
        };

        match serde_json::from_str::<AnthropicStreamEvent>(&event.data) {
            Ok(AnthropicStreamEvent::ContentBlockDelta {
                delta: AnthropicDelta::TextDelta { text },
            }) => self.ready.push_back(Ok(text)),
            Ok(AnthropicStreamEvent::MessageStop) => self.finished = true,
            Ok(AnthropicStreamEvent::Error { error }) => {
                self.ready.push_back(Err(LlmError::server_error(format!(
                    "{}: {}",
                    error.r#type, error.message
                ))));
            }
            Ok(_) => {}
            Err(e) => {
                self.ready.push_back(Err(LlmError::unknown(format!(
                    "Failed to parse stream event: {e} - data: {}",
                    event.data
                ))));
            }
        }
    }
}

// Anthropic API types

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct AnthropicMessage {
    role: &'static str,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(super) enum AnthropicContentBlock {
    Text {
        text: String,
    },
    /// Tool use and other blocks carry no reply text
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
pub(super) struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    usage: AnthropicUsage,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicStreamEvent {
    ContentBlockDelta {
        delta: AnthropicDelta,
    },
    MessageStop,
    Error {
        error: AnthropicApiError,
    },
    /// message_start, content_block_start, ping and friends
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicDelta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicApiError {
    r#type: String,
    message: String,
}

//! Mock provider for tests
//!
//! Replies are queued ahead of time and consumed one per call.

use super::{fragment_stream, LlmError, LlmRequest, LlmResponse, LlmService, TextStream, Usage};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;

/// What the next call returns
pub enum MockReply {
    /// Complete text; streamed word by word
    Text(String),
    /// Explicit fragments, possibly ending in an error
    Fragments(Vec<Result<String, LlmError>>),
    /// The call itself fails
    Fail(LlmError),
}

/// Mock LLM service that returns queued replies
pub struct MockLlmService {
    replies: Mutex<VecDeque<MockReply>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmService {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_text(&self, text: impl Into<String>) {
        self.queue(MockReply::Text(text.into()));
    }

    pub fn queue_fragments(&self, fragments: &[&str]) {
        self.queue(MockReply::Fragments(
            fragments.iter().map(|f| Ok((*f).to_string())).collect(),
        ));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.queue(MockReply::Fail(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_reply(&self, request: &LlmRequest) -> MockReply {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockReply::Fail(LlmError::network("No mock reply queued")))
    }
}

#[async_trait]
impl LlmService for MockLlmService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        match self.next_reply(request) {
            MockReply::Text(text) => Ok(LlmResponse {
                text,
                usage: Usage::default(),
            }),
            MockReply::Fragments(fragments) => {
                let text = fragments.into_iter().collect::<Result<Vec<_>, _>>()?.concat();
                Ok(LlmResponse {
                    text,
                    usage: Usage::default(),
                })
            }
            MockReply::Fail(error) => Err(error),
        }
    }

    async fn stream(&self, request: &LlmRequest) -> Result<TextStream, LlmError> {
        match self.next_reply(request) {
            MockReply::Text(text) => Ok(fragment_stream(&text)),
            MockReply::Fragments(fragments) => Ok(stream::iter(fragments).boxed()),
            MockReply::Fail(error) => Err(error),
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

//! Amazon Bedrock provider for Anthropic models
//!
//! Uses the runtime `invoke` endpoint with a Bedrock API key (bearer token).
//! Bedrock replies arrive whole; streaming falls back to the word-split
//! simulation of [`LlmService::stream`].

use super::anthropic::{normalize_response, user_message, AnthropicMessage, AnthropicResponse};
use super::types::{LlmRequest, LlmResponse};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "us.anthropic.claude-3-5-haiku-20241022-v1:0";

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const TOP_P: f32 = 0.999;
const TOP_K: u32 = 250;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Bedrock runtime service implementation
pub struct BedrockService {
    client: Client,
    token: String,
    invoke_url: String,
    model_id: String,
}

impl BedrockService {
    /// `endpoint` overrides the regional runtime URL (VPC endpoints, tests).
    pub fn new(
        token: String,
        region: &str,
        model: &str,
        endpoint: Option<&str>,
    ) -> Result<Self, LlmError> {
        let base = match endpoint {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://bedrock-runtime.{region}.amazonaws.com"),
        };

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            token,
            invoke_url: format!("{base}/model/{model}/invoke"),
            model_id: model.to_string(),
        })
    }

    fn translate_request(request: &LlmRequest) -> BedrockRequest {
        BedrockRequest {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: TOP_P,
            top_k: TOP_K,
            system: request.system.clone(),
            messages: vec![user_message(&request.prompt)],
        }
    }
}

#[async_trait]
impl LlmService for BedrockService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let response = self
            .client
            .post(&self.invoke_url)
            .bearer_auth(&self.token)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .json(&Self::translate_request(request))
            .send()
            .await
            .map_err(|e| LlmError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(LlmError::from_status(status, &body));
        }

        let parsed: AnthropicResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        // Multiple text blocks are joined with a space, as the widget always did
        Ok(normalize_response(parsed, " "))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[derive(Debug, Serialize)]
struct BedrockRequest {
    anthropic_version: &'static str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

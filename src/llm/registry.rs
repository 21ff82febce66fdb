//! Provider selection from configuration

use super::{anthropic, bedrock, AnthropicService, BedrockService, LlmError, LlmService, LoggingService};
use crate::config::ConfigError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Hosted inference backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Anthropic,
    Bedrock,
}

impl ProviderKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "Anthropic",
            ProviderKind::Bedrock => "Amazon Bedrock",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            ProviderKind::Anthropic => anthropic::DEFAULT_MODEL,
            ProviderKind::Bedrock => bedrock::DEFAULT_MODEL,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" => Ok(ProviderKind::Anthropic),
            "bedrock" => Ok(ProviderKind::Bedrock),
            other => Err(format!("unknown provider `{other}` (expected `anthropic` or `bedrock`)")),
        }
    }
}

/// Validated provider configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmConfig {
    Anthropic {
        /// "implicit" in gateway mode; the gateway authenticates
        api_key: String,
        gateway: Option<String>,
        model: String,
    },
    Bedrock {
        token: String,
        region: String,
        endpoint: Option<String>,
        model: String,
    },
}

impl LlmConfig {
    /// Read provider settings, failing on anything required but absent.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider = match lookup("CHAT_PROVIDER") {
            Some(value) => value.parse::<ProviderKind>().map_err(|reason| ConfigError::Invalid {
                var: "CHAT_PROVIDER",
                value: value.clone(),
                reason,
            })?,
            None => ProviderKind::default(),
        };
        let model = lookup("CHAT_MODEL").unwrap_or_else(|| provider.default_model().to_string());

        match provider {
            ProviderKind::Anthropic => {
                let gateway = lookup("LLM_GATEWAY");
                let api_key = match (lookup("ANTHROPIC_API_KEY"), &gateway) {
                    (Some(key), _) => key,
                    (None, Some(_)) => "implicit".to_string(),
                    (None, None) => return Err(ConfigError::Missing("ANTHROPIC_API_KEY")),
                };
                Ok(LlmConfig::Anthropic {
                    api_key,
                    gateway,
                    model,
                })
            }
            ProviderKind::Bedrock => Ok(LlmConfig::Bedrock {
                token: lookup("AWS_BEARER_TOKEN_BEDROCK")
                    .ok_or(ConfigError::Missing("AWS_BEARER_TOKEN_BEDROCK"))?,
                region: lookup("AWS_REGION").ok_or(ConfigError::Missing("AWS_REGION"))?,
                endpoint: lookup("BEDROCK_ENDPOINT"),
                model,
            }),
        }
    }

    pub fn provider(&self) -> ProviderKind {
        match self {
            LlmConfig::Anthropic { .. } => ProviderKind::Anthropic,
            LlmConfig::Bedrock { .. } => ProviderKind::Bedrock,
        }
    }
}

/// Build the configured provider, wrapped with request logging.
pub fn connect(config: &LlmConfig) -> Result<Arc<dyn LlmService>, LlmError> {
    let service: Arc<dyn LlmService> = match config {
        LlmConfig::Anthropic {
            api_key,
            gateway,
            model,
        } => Arc::new(AnthropicService::new(
            api_key.clone(),
            model,
            gateway.as_deref(),
        )?),
        LlmConfig::Bedrock {
            token,
            region,
            endpoint,
            model,
        } => Arc::new(BedrockService::new(
            token.clone(),
            region,
            model,
            endpoint.as_deref(),
        )?),
    };
    Ok(Arc::new(LoggingService::new(service)))
}

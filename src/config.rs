//! Process configuration
//!
//! Everything comes from the environment and is validated once at startup;
//! a missing required value stops the process before it binds a socket.

use crate::llm::{LlmConfig, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::protocol::FrameMode;
use crate::system_prompt;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("invalid value `{value}` for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// How the emitter packages replies
#[derive(Debug, Clone, PartialEq)]
pub struct EmitterConfig {
    /// Fixed for the deployment, advertised to clients per response
    pub frame_mode: FrameMode,
    /// Pause before each streamed frame; demo typing effect only
    pub stream_delay: Option<Duration>,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            frame_mode: FrameMode::default(),
            stream_delay: None,
            system_prompt: system_prompt::DEFAULT_PROMPT.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl EmitterConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let frame_mode = match lookup("CHAT_FRAME_MODE") {
            Some(value) => value
                .parse::<FrameMode>()
                .map_err(|e| invalid("CHAT_FRAME_MODE", &value, e.to_string()))?,
            None => FrameMode::default(),
        };

        let stream_delay = match lookup("CHAT_STREAM_DELAY_MS") {
            Some(value) => {
                let millis: u64 = value
                    .trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        invalid("CHAT_STREAM_DELAY_MS", &value, e.to_string())
                    })?;
                (millis > 0).then(|| Duration::from_millis(millis))
            }
            None => None,
        };

        Ok(Self {
            frame_mode,
            stream_delay,
            system_prompt: system_prompt::build(lookup("CHAT_SYSTEM_PROMPT").as_deref()),
            ..Self::default()
        })
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub llm: LlmConfig,
    pub emitter: EmitterConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key: &str| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("CHAT_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid("CHAT_PORT", &value, e.to_string()))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            port,
            llm: LlmConfig::from_lookup(lookup)?,
            emitter: EmitterConfig::from_lookup(lookup)?,
        })
    }
}

fn invalid(var: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(&lookup(&[("ANTHROPIC_API_KEY", "sk")])).unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.emitter.frame_mode, FrameMode::Delta);
        assert_eq!(config.emitter.stream_delay, None);
        assert_eq!(config.emitter.system_prompt, system_prompt::DEFAULT_PROMPT);
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let err = Config::from_lookup(&lookup(&[("CHAT_PORT", "9000")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ANTHROPIC_API_KEY")));
    }

    #[test]
    fn test_emitter_settings() {
        let config = Config::from_lookup(&lookup(&[
            ("ANTHROPIC_API_KEY", "sk"),
            ("CHAT_FRAME_MODE", "snapshot"),
            ("CHAT_STREAM_DELAY_MS", "50"),
            ("CHAT_SYSTEM_PROMPT", "You sell rubber ducks."),
            ("CHAT_PORT", "3000"),
        ]))
        .unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.emitter.frame_mode, FrameMode::Snapshot);
        assert_eq!(config.emitter.stream_delay, Some(Duration::from_millis(50)));
        assert_eq!(config.emitter.system_prompt, "You sell rubber ducks.");
    }

    #[test]
    fn test_zero_delay_disables() {
        let emitter =
            EmitterConfig::from_lookup(&lookup(&[("CHAT_STREAM_DELAY_MS", "0")])).unwrap();
        assert_eq!(emitter.stream_delay, None);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (var, value) in [
            ("CHAT_FRAME_MODE", "cumulative"),
            ("CHAT_STREAM_DELAY_MS", "soon"),
            ("CHAT_PORT", "eighty"),
        ] {
            let err = Config::from_lookup(&lookup(&[("ANTHROPIC_API_KEY", "sk"), (var, value)]))
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { var: v, .. } if v == var),
                "{var}: {err}"
            );
        }
    }
}

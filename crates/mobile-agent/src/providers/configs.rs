use std::time::Duration;

use crate::config::AgentConfig;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Connection settings for the Anthropic messages API
#[derive(Debug, Clone, PartialEq)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl AnthropicProviderConfig {
    pub fn from_agent_config(config: &AgentConfig) -> Self {
        AnthropicProviderConfig {
            host: config.host.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: Some(config.temperature),
            max_tokens: config.max_tokens,
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(600),
        }
    }
}

impl From<&AgentConfig> for AnthropicProviderConfig {
    fn from(config: &AgentConfig) -> Self {
        Self::from_agent_config(config)
    }
}

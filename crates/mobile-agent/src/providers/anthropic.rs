use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::base::{ModelResponse, Provider};
use super::configs::{AnthropicProviderConfig, ANTHROPIC_VERSION};
use super::utils::{
    anthropic_response_to_model_response, messages_to_anthropic_spec, tools_to_anthropic_spec,
};
use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::tool::ToolDescriptor;

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> AgentResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AnthropicProviderConfig {
        &self.config
    }

    async fn post(&self, payload: Value) -> AgentResult<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| AgentError::Api(format!("Invalid response body: {}", e)))
        } else {
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "model request failed");
            Err(AgentError::Api(format!(
                "Request failed: {} - {}",
                status,
                error_message(&error_text)
            )))
        }
    }
}

// Pull `error.message` out of an API error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> AgentResult<ModelResponse> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_anthropic_spec(messages),
            "max_tokens": self.config.max_tokens,
            "stream": false,
        });

        if let Some(object) = payload.as_object_mut() {
            if !system.is_empty() {
                object.insert("system".to_string(), json!(system));
            }
            if !tools.is_empty() {
                object.insert("tools".to_string(), json!(tools_to_anthropic_spec(tools)));
            }
            if let Some(temperature) = self.config.temperature {
                object.insert("temperature".to_string(), json!(temperature));
            }
        }

        tracing::info!(
            model = %self.config.model,
            messages = messages.len(),
            "requesting completion"
        );
        let response = self.post(payload).await?;

        let parsed = anthropic_response_to_model_response(&response)
            .map_err(|e| AgentError::Api(format!("{:#}", e)))?;
        tracing::debug!(
            stop_reason = parsed.stop_reason.as_str(),
            input_tokens = ?parsed.usage.input_tokens,
            output_tokens = ?parsed.usage.output_tokens,
            "completion received"
        );
        Ok(parsed)
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AgentResult;
use crate::models::content::ContentBlock;
use crate::models::message::Message;
use crate::models::tool::ToolDescriptor;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Why the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    Other(String),
}

impl StopReason {
    pub fn as_str(&self) -> &str {
        match self {
            StopReason::EndTurn => "end_turn",
            StopReason::ToolUse => "tool_use",
            StopReason::Other(reason) => reason,
        }
    }
}

impl From<&str> for StopReason {
    fn from(reason: &str) -> Self {
        match reason {
            "end_turn" => StopReason::EndTurn,
            "tool_use" => StopReason::ToolUse,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// One completion from the model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub id: Option<String>,
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl ModelResponse {
    pub fn new(content: Vec<ContentBlock>, stop_reason: StopReason) -> Self {
        ModelResponse {
            id: None,
            content,
            stop_reason,
            usage: Usage::default(),
        }
    }
}

/// Base trait for model backends
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next completion for the conversation so far. Never mutates `messages`.
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[ToolDescriptor],
    ) -> AgentResult<ModelResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_usage_serialization() {
        let usage = Usage::new(Some(10), Some(20), Some(30));
        let json_value = serde_json::to_value(&usage).unwrap();
        assert_eq!(
            json_value,
            json!({"input_tokens": 10, "output_tokens": 20, "total_tokens": 30})
        );
    }

    #[test]
    fn test_stop_reason_from_wire() {
        assert_eq!(StopReason::from("end_turn"), StopReason::EndTurn);
        assert_eq!(StopReason::from("tool_use"), StopReason::ToolUse);
        assert_eq!(
            StopReason::from("max_tokens"),
            StopReason::Other("max_tokens".to_string())
        );
        assert_eq!(StopReason::from("max_tokens").as_str(), "max_tokens");
    }
}

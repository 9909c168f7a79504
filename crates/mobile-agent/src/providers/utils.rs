use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};

use super::base::{ModelResponse, StopReason, Usage};
use crate::models::content::{ContentBlock, ToolUse};
use crate::models::message::{Message, MessageContent};
use crate::models::tool::ToolDescriptor;

/// Convert internal messages to the Anthropic `messages` array.
///
/// Only role and content go over the wire. Empty text blocks are dropped since the API rejects
/// them.
pub fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .filter_map(|message| {
            let content = match &message.content {
                MessageContent::Text(text) => json!(text),
                MessageContent::Blocks(blocks) => {
                    let blocks: Vec<Value> = blocks
                        .iter()
                        .filter(|block| !matches!(block.as_text(), Some("")))
                        .map(|block| json!(block))
                        .collect();
                    // The API rejects messages with no content
                    if blocks.is_empty() {
                        return None;
                    }
                    Value::Array(blocks)
                }
            };
            Some(json!({
                "role": message.role.as_str(),
                "content": content,
            }))
        })
        .collect()
}

pub fn tools_to_anthropic_spec(tools: &[ToolDescriptor]) -> Vec<Value> {
    tools
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name,
                "description": tool.description,
                "input_schema": tool.input_schema,
            })
        })
        .collect()
}

/// Parse a messages API response body.
///
/// Block types other than `text` and `tool_use` are skipped.
pub fn anthropic_response_to_model_response(response: &Value) -> Result<ModelResponse> {
    let blocks = response
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Invalid response format from Anthropic API: missing content"))?;

    let mut content = Vec::with_capacity(blocks.len());
    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                let text = block.get("text").and_then(Value::as_str).unwrap_or_default();
                content.push(ContentBlock::text(text));
            }
            Some("tool_use") => {
                let tool_use: ToolUse = serde_json::from_value(block.clone())
                    .context("Invalid tool_use block in Anthropic response")?;
                content.push(ContentBlock::ToolUse(tool_use));
            }
            other => {
                tracing::debug!(block_type = ?other, "skipping unsupported content block");
            }
        }
    }

    let stop_reason = response
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(StopReason::from)
        .unwrap_or_else(|| StopReason::Other("unknown".to_string()));

    Ok(ModelResponse {
        id: response.get("id").and_then(Value::as_str).map(str::to_string),
        content,
        stop_reason,
        usage: get_usage(response),
    })
}

pub fn get_usage(response: &Value) -> Usage {
    let usage = response.get("usage");
    let read = |key: &str| {
        usage
            .and_then(|u| u.get(key))
            .and_then(Value::as_i64)
            .map(|v| v as i32)
    };
    let input_tokens = read("input_tokens");
    let output_tokens = read("output_tokens");
    let total_tokens = match (input_tokens, output_tokens) {
        (Some(input), Some(output)) => Some(input + output),
        _ => None,
    };
    Usage::new(input_tokens, output_tokens, total_tokens)
}

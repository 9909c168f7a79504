use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::errors::AgentError;

/// A single parameter in a tool's input schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

impl Property {
    pub fn string<D: Into<String>>(description: D) -> Self {
        Property {
            kind: "string".to_string(),
            description: description.into(),
            allowed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, Property>,
    pub required: Vec<String>,
}

impl InputSchema {
    pub fn object<I>(properties: I, required: &[&str]) -> Self
    where
        I: IntoIterator<Item = (&'static str, Property)>,
    {
        InputSchema {
            kind: "object".to_string(),
            properties: properties
                .into_iter()
                .map(|(name, property)| (name.to_string(), property))
                .collect(),
            required: required.iter().map(|name| name.to_string()).collect(),
        }
    }
}

/// A tool that can be used by a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema of the parameters the tool accepts
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    pub fn new<N, D>(name: N, description: D, input_schema: InputSchema) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        ToolDescriptor {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

/// Outcome of dispatching a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResult {
    Success {
        output: String,
        #[serde(default)]
        metadata: Map<String, Value>,
    },
    Error {
        message: String,
        #[serde(default)]
        details: Map<String, Value>,
    },
}

impl ToolResult {
    pub fn success<S: Into<String>>(output: S) -> Self {
        ToolResult::Success {
            output: output.into(),
            metadata: Map::new(),
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        ToolResult::Error {
            message: message.into(),
            details: Map::new(),
        }
    }

    /// Attach a metadata entry on success, or a detail entry on error
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        match &mut self {
            ToolResult::Success { metadata, .. } => metadata.insert(key.into(), value.into()),
            ToolResult::Error { details, .. } => details.insert(key.into(), value.into()),
        };
        self
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error { .. })
    }

    /// The text that is fed back to the model
    pub fn content(&self) -> &str {
        match self {
            ToolResult::Success { output, .. } => output,
            ToolResult::Error { message, .. } => message,
        }
    }

    /// The text that is shown to the user while the agent runs
    pub fn summary(&self) -> String {
        match self {
            ToolResult::Success { output, .. } => output.clone(),
            ToolResult::Error { message, .. } => format!("Error: {}", message),
        }
    }
}

impl From<AgentError> for ToolResult {
    fn from(error: AgentError) -> Self {
        ToolResult::error(error.to_string())
    }
}

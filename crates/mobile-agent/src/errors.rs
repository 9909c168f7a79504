use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    /// The model backend could not be reached (connect, timeout, broken body stream)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The model backend answered with a non-success status or a body we could not parse
    #[error("API error: {0}")]
    Api(String),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    #[error("{0}")]
    ToolInputInvalid(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Command exited with code {code}: {stderr}")]
    CommandNonZeroExit { code: i32, stderr: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            AgentError::ToolNotFound("frobnicate".into()).to_string(),
            "Unknown tool: frobnicate"
        );
        assert_eq!(
            AgentError::ToolInputInvalid("Missing path parameter".into()).to_string(),
            "Missing path parameter"
        );
        assert_eq!(
            AgentError::CommandNonZeroExit {
                code: 2,
                stderr: "boom".into()
            }
            .to_string(),
            "Command exited with code 2: boom"
        );
    }
}

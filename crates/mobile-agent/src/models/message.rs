use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::content::{ContentBlock, ToolResultContent, ToolUse};
use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
/// The body of a message: either a bare string or an ordered list of blocks
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            MessageContent::Text(_) => &[],
            MessageContent::Blocks(blocks) => blocks,
        }
    }

    /// Concatenation of all text in the content
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(ContentBlock::as_text)
                .collect::<Vec<_>>()
                .concat(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A message to or from the model
pub struct Message {
    pub role: Role,
    pub created: i64,
    pub content: MessageContent,
}

impl Message {
    /// Create a new user message with empty block content and the current timestamp
    pub fn user() -> Self {
        Self::new(Role::User, MessageContent::Blocks(Vec::new()))
    }

    /// Create a new assistant message with empty block content and the current timestamp
    pub fn assistant() -> Self {
        Self::new(Role::Assistant, MessageContent::Blocks(Vec::new()))
    }

    /// Create a user message whose content is a plain string
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, MessageContent::Text(text.into()))
    }

    fn new(role: Role, content: MessageContent) -> Self {
        Message {
            role,
            created: Utc::now().timestamp(),
            content,
        }
    }

    /// Add a block to the message, promoting plain text content to a text block first
    pub fn with_block(mut self, block: ContentBlock) -> Self {
        match &mut self.content {
            MessageContent::Blocks(blocks) => blocks.push(block),
            MessageContent::Text(text) => {
                let existing = ContentBlock::text(std::mem::take(text));
                self.content = MessageContent::Blocks(vec![existing, block]);
            }
        }
        self
    }

    pub fn with_blocks<I: IntoIterator<Item = ContentBlock>>(self, blocks: I) -> Self {
        blocks.into_iter().fold(self, Message::with_block)
    }

    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_block(ContentBlock::text(text))
    }

    pub fn with_tool_use<I: Into<String>, N: Into<String>>(
        self,
        id: I,
        name: N,
        input: Map<String, Value>,
    ) -> Self {
        self.with_block(ContentBlock::tool_use(id, name, input))
    }

    pub fn with_tool_result<I: Into<String>, C: Into<String>>(
        self,
        tool_use_id: I,
        content: C,
        is_error: bool,
    ) -> Self {
        self.with_block(ContentBlock::tool_result(tool_use_id, content, is_error))
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolUse> {
        self.content.blocks().iter().filter_map(ContentBlock::as_tool_use)
    }

    pub fn tool_results(&self) -> impl Iterator<Item = &ToolResultContent> {
        self.content
            .blocks()
            .iter()
            .filter_map(ContentBlock::as_tool_result)
    }

    pub fn text(&self) -> String {
        self.content.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_text_serializes_as_string() {
        let message = Message::user_text("hello");
        let value = serde_json::to_value(&message.content).unwrap();
        assert_eq!(value, json!("hello"));
    }

    #[test]
    fn test_with_block_promotes_plain_text() {
        let message = Message::user_text("first").with_text("second");
        assert_eq!(message.content.blocks().len(), 2);
        assert_eq!(message.text(), "firstsecond");
    }

    #[test]
    fn test_tool_accessors() {
        let mut input = Map::new();
        input.insert("command".into(), json!("pwd"));
        let message = Message::assistant()
            .with_text("running")
            .with_tool_use("toolu_1", "execute_command", input);

        let uses: Vec<_> = message.tool_uses().collect();
        assert_eq!(uses.len(), 1);
        assert_eq!(uses[0].name, "execute_command");
        assert_eq!(message.tool_results().count(), 0);
        assert_eq!(message.role, Role::Assistant);
    }

    #[test]
    fn test_round_trip_blocks() {
        let message = Message::user().with_tool_result("toolu_1", "done", true);
        let serialized = serde_json::to_string(&message).unwrap();
        let parsed: Message = serde_json::from_str(&serialized).unwrap();
        assert_eq!(parsed, message);
    }
}

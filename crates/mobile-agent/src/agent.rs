use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::config::{AgentConfig, DEFAULT_MAX_ITERATIONS};
use crate::conversation::Conversation;
use crate::errors::AgentResult;
use crate::models::content::{ContentBlock, ToolUse};
use crate::models::message::Message;
use crate::models::tool::ToolResult;
use crate::prompt_template::system_prompt;
use crate::providers::anthropic::AnthropicProvider;
use crate::providers::base::{Provider, StopReason};
use crate::providers::configs::AnthropicProviderConfig;
use crate::shell::CommandEngine;
use crate::tools::{all_tools, ToolDispatcher};

/// Progress notifications emitted while an agent run dispatches tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolEvent {
    Started { name: String },
    /// `summary` is the tool output, or `Error: <message>` when the tool failed
    Finished { name: String, summary: String },
}

/// Observes tool progress. Each event is awaited before the run continues.
#[async_trait]
pub trait ToolEventListener: Send + Sync {
    async fn on_event(&self, event: ToolEvent);
}

/// Ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

#[async_trait]
impl ToolEventListener for NoopListener {
    async fn on_event(&self, _event: ToolEvent) {}
}

#[async_trait]
impl ToolEventListener for UnboundedSender<ToolEvent> {
    async fn on_event(&self, event: ToolEvent) {
        // A dropped receiver only means nobody is watching
        let _ = self.send(event);
    }
}

/// Agent integrates a model with the tools it needs to act on the device
pub struct Agent {
    provider: Box<dyn Provider>,
    dispatcher: ToolDispatcher,
    conversation: Conversation,
    max_iterations: usize,
}

impl Agent {
    pub fn new(provider: Box<dyn Provider>, dispatcher: ToolDispatcher) -> Self {
        Self {
            provider,
            dispatcher,
            conversation: Conversation::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// An agent talking to the Anthropic API with tools over the local file system
    pub fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        let provider = AnthropicProvider::new(AnthropicProviderConfig::from(config))?;
        let dispatcher = ToolDispatcher::from_config(config)?;
        Ok(Agent::new(Box::new(provider), dispatcher).with_max_iterations(config.max_iterations))
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Continue from an earlier transcript
    pub fn with_history(mut self, messages: Vec<Message>) -> Self {
        for message in messages {
            self.conversation.append(message);
        }
        self
    }

    pub fn history(&self) -> Vec<Message> {
        self.conversation.snapshot()
    }

    pub fn clear_history(&mut self) {
        self.conversation.clear();
    }

    pub fn history_len(&self) -> usize {
        self.conversation.len()
    }

    /// Forget everything after the first `len` messages, used to undo an interrupted run
    pub fn rewind(&mut self, len: usize) {
        self.conversation.truncate(len);
    }

    pub fn engine(&self) -> &CommandEngine {
        self.dispatcher.engine()
    }

    /// Run one user turn to completion and return the text the model produced.
    ///
    /// Model failures end the run with an `Error: ` prefixed string; tool failures are reported
    /// back to the model and the run continues.
    pub async fn run(&mut self, user_text: &str, listener: &dyn ToolEventListener) -> String {
        self.conversation.append(Message::user_text(user_text));
        let mut final_text = String::new();

        for iteration in 1..=self.max_iterations {
            let system = self.system_prompt();
            tracing::info!(iteration, "calling model");
            let response = match self
                .provider
                .complete(&system, self.conversation.messages(), all_tools())
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(error = %e, "model call failed");
                    return format!("Error: {}", e);
                }
            };

            let mut pending: Vec<ContentBlock> = Vec::new();
            for block in response.content {
                match block {
                    // An empty block would leave an assistant message with no content on the wire
                    ContentBlock::Text(text) if text.text.is_empty() => {}
                    ContentBlock::Text(text) => {
                        final_text.push_str(&text.text);
                        pending.push(ContentBlock::Text(text));
                    }
                    ContentBlock::ToolUse(tool_use) => {
                        let (tool_use, result) = self.handle_tool_use(tool_use, listener).await;
                        let id = tool_use.id.clone();
                        pending.push(ContentBlock::ToolUse(tool_use));
                        self.flush(&mut pending);
                        self.conversation.append(Message::user().with_tool_result(
                            id,
                            result.content(),
                            result.is_error(),
                        ));
                    }
                    // Results only ever come from our side
                    ContentBlock::ToolResult(_) => {}
                }
            }
            self.flush(&mut pending);

            match response.stop_reason {
                StopReason::ToolUse => continue,
                StopReason::EndTurn => return final_text,
                StopReason::Other(reason) => {
                    tracing::warn!(stop_reason = %reason, "model stopped early");
                    return final_text;
                }
            }
        }

        tracing::warn!(max_iterations = self.max_iterations, "iteration limit reached");
        let notice = format!(
            "[Stopped after {} model calls without a final answer]",
            self.max_iterations
        );
        if final_text.is_empty() {
            notice
        } else {
            format!("{}\n\n{}", final_text, notice)
        }
    }

    // Dispatch a well formed tool use, or answer a malformed one with an error so every use
    // in history still has exactly one result.
    async fn handle_tool_use(
        &mut self,
        mut tool_use: ToolUse,
        listener: &dyn ToolEventListener,
    ) -> (ToolUse, ToolResult) {
        if !tool_use.is_well_formed() {
            let mut missing = Vec::new();
            if tool_use.id.is_empty() {
                tool_use.id = format!("toolu_missing_{}", Uuid::new_v4().simple());
                missing.push("id");
            }
            if tool_use.name.is_empty() {
                tool_use.name = "invalid_tool_call".to_string();
                missing.push("name");
            }
            tracing::warn!(id = %tool_use.id, ?missing, "malformed tool use");
            let result = ToolResult::error(format!(
                "Invalid tool call: missing {}",
                missing.join(" and ")
            ));
            return (tool_use, result);
        }

        listener
            .on_event(ToolEvent::Started {
                name: tool_use.name.clone(),
            })
            .await;
        let result = self
            .dispatcher
            .execute_tool(&tool_use.name, &tool_use.input)
            .await;
        listener
            .on_event(ToolEvent::Finished {
                name: tool_use.name.clone(),
                summary: result.summary(),
            })
            .await;
        (tool_use, result)
    }

    fn flush(&mut self, pending: &mut Vec<ContentBlock>) {
        if !pending.is_empty() {
            self.conversation
                .append(Message::assistant().with_blocks(pending.drain(..)));
        }
    }

    fn system_prompt(&self) -> String {
        system_prompt(all_tools(), self.dispatcher.engine().current_directory()).unwrap_or_else(
            |e| {
                tracing::warn!(error = %e, "failed to render system prompt");
                String::new()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Directories;
    use crate::errors::AgentError;
    use crate::fs::LocalFileSystem;
    use crate::models::role::Role;
    use crate::providers::base::ModelResponse;
    use crate::providers::mock::MockProvider;
    use crate::runtime::RuntimeManager;
    use serde_json::{json, Map, Value};
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn dispatcher() -> (TempDir, ToolDispatcher) {
        let dir = tempfile::tempdir().unwrap();
        let directories = Directories::from_home(dir.path().join("home"));
        directories.ensure().unwrap();
        let runtimes = RuntimeManager::new(directories.tmp.clone(), Duration::from_secs(30));
        let engine = CommandEngine::new(directories);
        (
            dir,
            ToolDispatcher::new(engine, Arc::new(LocalFileSystem), runtimes),
        )
    }

    fn input(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn text(text: &str) -> AgentResult<ModelResponse> {
        Ok(ModelResponse::new(
            vec![ContentBlock::text(text)],
            StopReason::EndTurn,
        ))
    }

    fn tool_call(id: &str, command: &str) -> AgentResult<ModelResponse> {
        Ok(ModelResponse::new(
            vec![
                ContentBlock::text(format!("Running {}", command)),
                ContentBlock::tool_use(id, "execute_command", input(json!({"command": command}))),
            ],
            StopReason::ToolUse,
        ))
    }

    // Every tool use id in `messages` has exactly one result
    fn assert_paired(messages: &[Message]) {
        let uses: Vec<String> = messages
            .iter()
            .flat_map(|m| m.tool_uses().map(|u| u.id.clone()))
            .collect();
        let results: Vec<String> = messages
            .iter()
            .flat_map(|m| m.tool_results().map(|r| r.tool_use_id.clone()))
            .collect();
        assert_eq!(uses.len(), results.len());
        let unique: HashSet<&String> = results.iter().collect();
        assert_eq!(unique.len(), results.len());
        for id in &uses {
            assert!(results.contains(id), "no result for {}", id);
        }
    }

    #[tokio::test]
    async fn test_end_turn_on_first_call() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![Ok(ModelResponse::new(
            vec![ContentBlock::text("Hello, "), ContentBlock::text("world")],
            StopReason::EndTurn,
        ))]);
        let calls = provider.call_counter();
        let mut agent = Agent::new(Box::new(provider), dispatcher);

        let reply = agent.run("Hi", &NoopListener).await;
        assert_eq!(reply, "Hello, world");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let history = agent.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_tool_use_rounds_then_end_turn() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![
            tool_call("toolu_1", "mkdir notes"),
            tool_call("toolu_2", "ls"),
            text("Done"),
        ]);
        let calls = provider.call_counter();
        let seen = provider.seen_messages();
        let mut agent = Agent::new(Box::new(provider), dispatcher);

        let reply = agent.run("make a notes dir", &NoopListener).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(reply, "Running mkdir notesRunning lsDone");

        // each model call sees a fully paired history
        for messages in seen.lock().unwrap().iter() {
            assert_paired(messages);
        }
        let history = agent.history();
        assert_paired(&history);

        let ls_result = history
            .iter()
            .flat_map(|m| m.tool_results())
            .find(|r| r.tool_use_id == "toolu_2")
            .unwrap();
        assert!(ls_result.content.contains("d notes (0 bytes)"));
        assert!(!ls_result.is_error);
    }

    #[tokio::test]
    async fn test_failed_tool_is_reported_to_model() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![
            tool_call("toolu_1", "cat missing.txt"),
            text("That file does not exist."),
        ]);
        let mut agent = Agent::new(Box::new(provider), dispatcher);

        agent.run("show missing.txt", &NoopListener).await;
        let result = agent
            .history()
            .iter()
            .flat_map(|m| m.tool_results().cloned().collect::<Vec<_>>())
            .next()
            .unwrap();
        assert!(result.is_error);
        assert_eq!(result.content, "File not found: missing.txt");
    }

    #[tokio::test]
    async fn test_transport_error_returns_error_text() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![Err(AgentError::Transport(
            "connection refused".to_string(),
        ))]);
        let mut agent = Agent::new(Box::new(provider), dispatcher);

        let reply = agent.run("Hi", &NoopListener).await;
        assert!(reply.starts_with("Error:"));
        assert!(reply.contains("connection refused"));

        let history = agent.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].text(), "Hi");
    }

    #[tokio::test]
    async fn test_malformed_tool_use_gets_synthetic_result() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![
            Ok(ModelResponse::new(
                vec![ContentBlock::tool_use("", "execute_command", Map::new())],
                StopReason::ToolUse,
            )),
            text("ok"),
        ]);
        let mut agent = Agent::new(Box::new(provider), dispatcher);

        agent.run("Hi", &NoopListener).await;
        let history = agent.history();
        assert_paired(&history);

        let tool_use = history.iter().flat_map(|m| m.tool_uses()).next().unwrap();
        assert!(tool_use.id.starts_with("toolu_missing_"));
        let result = history.iter().flat_map(|m| m.tool_results()).next().unwrap();
        assert!(result.is_error);
        assert_eq!(result.content, "Invalid tool call: missing id");
    }

    #[tokio::test]
    async fn test_listener_sees_start_and_finish() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![tool_call("toolu_1", "echo hi"), text("done")]);
        let mut agent = Agent::new(Box::new(provider), dispatcher);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        agent.run("say hi", &tx).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            ToolEvent::Started {
                name: "execute_command".to_string()
            }
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            ToolEvent::Finished {
                name: "execute_command".to_string(),
                summary: "hi".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_other_stop_reason_terminates() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![Ok(ModelResponse::new(
            vec![ContentBlock::text("partial answ")],
            StopReason::Other("max_tokens".to_string()),
        ))]);
        let calls = provider.call_counter();
        let mut agent = Agent::new(Box::new(provider), dispatcher);

        let reply = agent.run("Hi", &NoopListener).await;
        assert_eq!(reply, "partial answ");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(agent.history().len(), 2);
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(
            (0..10)
                .map(|i| tool_call(&format!("toolu_{}", i), "pwd"))
                .collect(),
        );
        let calls = provider.call_counter();
        let mut agent = Agent::new(Box::new(provider), dispatcher).with_max_iterations(3);

        let reply = agent.run("loop forever", &NoopListener).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(reply.contains("Stopped after 3 model calls"));
        assert_paired(&agent.history());
    }

    #[tokio::test]
    async fn test_clear_history() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![text("one"), text("two")]);
        let seen = provider.seen_messages();
        let mut agent = Agent::new(Box::new(provider), dispatcher);

        agent.run("first", &NoopListener).await;
        agent.clear_history();
        assert!(agent.history().is_empty());

        agent.run("second", &NoopListener).await;
        let second_call = seen.lock().unwrap()[1].clone();
        assert_eq!(second_call.len(), 1);
        assert_eq!(second_call[0].text(), "second");
    }

    #[tokio::test]
    async fn test_rewind_drops_the_last_turn() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![text("one"), text("two")]);
        let mut agent = Agent::new(Box::new(provider), dispatcher);

        agent.run("first", &NoopListener).await;
        let mark = agent.history_len();
        agent.run("second", &NoopListener).await;
        assert_eq!(agent.history_len(), 4);

        agent.rewind(mark);
        let history = agent.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].text(), "one");
    }

    #[tokio::test]
    async fn test_with_history_is_sent_to_the_model() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![text("welcome back")]);
        let seen = provider.seen_messages();
        let mut agent = Agent::new(Box::new(provider), dispatcher).with_history(vec![
            Message::user_text("earlier"),
            Message::assistant().with_text("noted"),
        ]);

        agent.run("again", &NoopListener).await;
        let first_call = seen.lock().unwrap()[0].clone();
        assert_eq!(first_call.len(), 3);
        assert_eq!(first_call[0].text(), "earlier");
        assert_eq!(first_call[2].text(), "again");
    }

    #[tokio::test]
    async fn test_empty_reply_leaves_no_empty_assistant_message() {
        let (_dir, dispatcher) = dispatcher();
        let provider = MockProvider::new(vec![text(""), text("second answer")]);
        let seen = provider.seen_messages();
        let mut agent = Agent::new(Box::new(provider), dispatcher);

        assert_eq!(agent.run("one", &NoopListener).await, "");
        assert_eq!(agent.history().len(), 1);

        let reply = agent.run("two", &NoopListener).await;
        assert_eq!(reply, "second answer");

        let second_call = seen.lock().unwrap()[1].clone();
        let wire = crate::providers::utils::messages_to_anthropic_spec(&second_call);
        for message in &wire {
            assert_ne!(message["content"], json!([]));
        }
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0]["content"], json!("one"));
        assert_eq!(wire[1]["content"], json!("two"));
    }
}

use std::io;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::AgentConfig;
use crate::errors::{AgentError, AgentResult};
use crate::fs::{FileSystem, LocalFileSystem};
use crate::models::tool::ToolResult;
use crate::runtime::{Runtime, RuntimeManager};
use crate::shell::CommandEngine;

/// Routes tool calls by name to the command engine, the file system and the script runtimes.
///
/// Relative paths in tool parameters resolve against the engine's current directory.
pub struct ToolDispatcher {
    engine: CommandEngine,
    fs: Arc<dyn FileSystem>,
    runtimes: RuntimeManager,
}

impl ToolDispatcher {
    pub fn new(engine: CommandEngine, fs: Arc<dyn FileSystem>, runtimes: RuntimeManager) -> Self {
        ToolDispatcher {
            engine,
            fs,
            runtimes,
        }
    }

    /// A dispatcher over the local file system, creating the configured directory roots
    pub fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        let directories = config.directories();
        directories.ensure()?;
        let runtimes = RuntimeManager::new(directories.tmp.clone(), config.command_timeout());
        let engine = CommandEngine::new(directories).with_timeout(config.command_timeout());
        Ok(ToolDispatcher::new(
            engine,
            Arc::new(LocalFileSystem),
            runtimes,
        ))
    }

    pub fn engine(&self) -> &CommandEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut CommandEngine {
        &mut self.engine
    }

    pub fn runtimes(&self) -> &RuntimeManager {
        &self.runtimes
    }

    /// Run one tool call. Every failure comes back as [`ToolResult::Error`].
    pub async fn execute_tool(&mut self, name: &str, params: &Map<String, Value>) -> ToolResult {
        tracing::info!(tool = name, "dispatching tool");
        match self.dispatch(name, params).await {
            Ok(result) => result,
            Err(e) => e.into(),
        }
    }

    async fn dispatch(&mut self, name: &str, params: &Map<String, Value>) -> AgentResult<ToolResult> {
        match name {
            "execute_command" => self.execute_command(params).await,
            "read_file" => self.read_file(params).await,
            "write_file" => self.write_file(params).await,
            "list_files" => self.list_files(params).await,
            "create_directory" => self.create_directory(params).await,
            "delete_file" => self.delete_file(params).await,
            "run_python" => {
                let code = required(params, "code")?;
                run_code(&self.runtimes.python, self.engine.current_directory(), &code).await
            }
            "run_javascript" => {
                let code = required(params, "code")?;
                run_code(&self.runtimes.node, self.engine.current_directory(), &code).await
            }
            _ => Err(AgentError::ToolNotFound(name.to_string())),
        }
    }

    async fn execute_command(&mut self, params: &Map<String, Value>) -> AgentResult<ToolResult> {
        let command = required(params, "command")?;

        if let Some(target) = as_change_directory(&command) {
            let result = self.engine.change_directory(target).await;
            return Ok(if result.success() {
                ToolResult::success(format!(
                    "Current directory: {}",
                    self.engine.current_directory().display()
                ))
                .with("exit_code", 0)
            } else {
                ToolResult::error(result.stderr).with("exit_code", result.exit_code)
            });
        }

        let result = self.engine.execute(&command).await;
        Ok(if result.success() {
            let output = if result.stdout.is_empty() {
                "Command executed successfully".to_string()
            } else {
                result.stdout
            };
            ToolResult::success(output).with("exit_code", result.exit_code)
        } else {
            let message = if result.stderr.is_empty() {
                format!("Command failed with exit code {}", result.exit_code)
            } else {
                result.stderr
            };
            ToolResult::error(message)
                .with("exit_code", result.exit_code)
                .with("output", result.stdout)
        })
    }

    async fn read_file(&self, params: &Map<String, Value>) -> AgentResult<ToolResult> {
        let path = required(params, "path")?;
        let resolved = self.engine.resolve(&path);

        Ok(match self.with_fs(move |fs| fs.read_file(&resolved)).await? {
            Ok(content) => {
                let size = content.len();
                ToolResult::success(content)
                    .with("path", path)
                    .with("size", size)
            }
            Err(e) => ToolResult::error(format!("Failed to read file: {}: {}", path, e)),
        })
    }

    async fn write_file(&self, params: &Map<String, Value>) -> AgentResult<ToolResult> {
        let path = required(params, "path")?;
        let content = required(params, "content")?;
        let size = content.len();
        let resolved = self.engine.resolve(&path);

        Ok(
            match self
                .with_fs(move |fs| fs.write_file(&resolved, &content))
                .await?
            {
                Ok(()) => ToolResult::success(format!("File written successfully to {}", path))
                    .with("path", path)
                    .with("size", size),
                Err(e) => ToolResult::error(format!("Failed to write file: {}: {}", path, e)),
            },
        )
    }

    async fn list_files(&self, params: &Map<String, Value>) -> AgentResult<ToolResult> {
        let (label, resolved) = match optional(params, "path") {
            Some(path) => {
                let resolved = self.engine.resolve(&path);
                (path, resolved)
            }
            None => {
                let cwd = self.engine.current_directory().to_path_buf();
                (cwd.display().to_string(), cwd)
            }
        };

        let is_dir = tokio::fs::metadata(&resolved)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Ok(ToolResult::error(format!("Not a directory: {}", label)));
        }

        Ok(match self.with_fs(move |fs| fs.list(&resolved)).await? {
            Ok(entries) => {
                let count = entries.len();
                let lines: Vec<String> = entries
                    .iter()
                    .map(|entry| {
                        if entry.is_dir {
                            format!("DIR  {}", entry.name)
                        } else {
                            format!("FILE  {}  {} bytes", entry.name, entry.size)
                        }
                    })
                    .collect();
                let output = if lines.is_empty() {
                    "Directory is empty".to_string()
                } else {
                    lines.join("\n")
                };
                ToolResult::success(output)
                    .with("path", label)
                    .with("count", count)
            }
            Err(e) => ToolResult::error(format!("Failed to list directory: {}: {}", label, e)),
        })
    }

    async fn create_directory(&self, params: &Map<String, Value>) -> AgentResult<ToolResult> {
        let path = required(params, "path")?;
        let resolved = self.engine.resolve(&path);

        Ok(
            match self.with_fs(move |fs| fs.create_directory(&resolved)).await? {
                Ok(()) => ToolResult::success(format!("Directory created: {}", path))
                    .with("path", path),
                Err(e) => {
                    ToolResult::error(format!("Failed to create directory: {}: {}", path, e))
                }
            },
        )
    }

    async fn delete_file(&self, params: &Map<String, Value>) -> AgentResult<ToolResult> {
        let path = required(params, "path")?;
        let resolved = self.engine.resolve(&path);

        Ok(match self.with_fs(move |fs| fs.delete(&resolved)).await? {
            Ok(()) => ToolResult::success(format!("Deleted: {}", path)).with("path", path),
            Err(e) => ToolResult::error(format!("Failed to delete: {}: {}", path, e)),
        })
    }

    // File system calls block, so they run on the blocking pool
    async fn with_fs<T, F>(&self, op: F) -> AgentResult<io::Result<T>>
    where
        F: FnOnce(&dyn FileSystem) -> io::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let fs = Arc::clone(&self.fs);
        tokio::task::spawn_blocking(move || op(fs.as_ref()))
            .await
            .map_err(|e| AgentError::ToolExecution(e.to_string()))
    }
}

async fn run_code(runtime: &dyn Runtime, cwd: &Path, code: &str) -> AgentResult<ToolResult> {
    let result = match runtime.execute_code(code, cwd).await {
        Ok(output) => ToolResult::success(output),
        Err(AgentError::CommandNonZeroExit { stderr, .. }) => ToolResult::error(format!(
            "{} execution failed:\n{}",
            runtime.display_name(),
            stderr
        )),
        Err(e) => ToolResult::error(e.to_string()),
    };
    Ok(result.with("language", runtime.language()))
}

/// `cd` and `cd <path>` move the engine itself instead of a throwaway subshell
fn as_change_directory(command: &str) -> Option<&str> {
    let mut words = command.split_whitespace();
    if words.next()? != "cd" {
        return None;
    }
    let target = words.next().unwrap_or("~");
    if words.next().is_some() || target.contains(['&', ';', '|', '<', '>', '$', '`']) {
        return None;
    }
    Some(target)
}

fn optional(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn required(params: &Map<String, Value>, key: &str) -> AgentResult<String> {
    optional(params, key)
        .ok_or_else(|| AgentError::ToolInputInvalid(format!("Missing {} parameter", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Directories;
    use serde_json::json;
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

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (_dir, mut dispatcher) = dispatcher();
        let result = dispatcher.execute_tool("frobnicate", &Map::new()).await;
        assert!(result.is_error());
        assert!(result.content().contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_missing_parameter() {
        let (_dir, mut dispatcher) = dispatcher();
        let result = dispatcher.execute_tool("execute_command", &Map::new()).await;
        assert_eq!(result, ToolResult::error("Missing command parameter"));

        let result = dispatcher
            .execute_tool("write_file", &params(json!({"path": "a.txt"})))
            .await;
        assert_eq!(result, ToolResult::error("Missing content parameter"));
    }

    #[tokio::test]
    async fn test_execute_command_outputs() {
        let (_dir, mut dispatcher) = dispatcher();

        let result = dispatcher
            .execute_tool("execute_command", &params(json!({"command": "touch a.txt"})))
            .await;
        assert_eq!(result.content(), "File created: a.txt");

        let result = dispatcher
            .execute_tool("execute_command", &params(json!({"command": "true"})))
            .await;
        assert_eq!(
            result,
            ToolResult::success("Command executed successfully").with("exit_code", 0)
        );

        let result = dispatcher
            .execute_tool("execute_command", &params(json!({"command": "exit 4"})))
            .await;
        assert_eq!(
            result,
            ToolResult::error("Command failed with exit code 4")
                .with("exit_code", 4)
                .with("output", "")
        );
    }

    #[tokio::test]
    async fn test_cd_moves_engine() {
        let (_dir, mut dispatcher) = dispatcher();
        let home = dispatcher.engine().directories().home.clone();

        let result = dispatcher
            .execute_tool("execute_command", &params(json!({"command": "cd tmp"})))
            .await;
        assert!(!result.is_error());
        assert_eq!(dispatcher.engine().current_directory(), home.join("tmp"));

        let result = dispatcher
            .execute_tool("execute_command", &params(json!({"command": "cd nowhere"})))
            .await;
        assert!(result.content().contains("Directory not found: nowhere"));
        assert_eq!(dispatcher.engine().current_directory(), home.join("tmp"));
    }

    #[tokio::test]
    async fn test_file_tools_resolve_against_current_directory() {
        let (_dir, mut dispatcher) = dispatcher();
        let home = dispatcher.engine().directories().home.clone();

        let result = dispatcher
            .execute_tool(
                "write_file",
                &params(json!({"path": "notes/todo.txt", "content": "buy milk"})),
            )
            .await;
        assert_eq!(
            result.content(),
            "File written successfully to notes/todo.txt"
        );
        assert!(home.join("notes/todo.txt").is_file());

        let result = dispatcher
            .execute_tool("read_file", &params(json!({"path": "notes/todo.txt"})))
            .await;
        assert_eq!(
            result,
            ToolResult::success("buy milk")
                .with("path", "notes/todo.txt")
                .with("size", 8)
        );

        let result = dispatcher
            .execute_tool("list_files", &params(json!({"path": "notes"})))
            .await;
        assert_eq!(result.content(), "FILE  todo.txt  8 bytes");
    }

    #[tokio::test]
    async fn test_list_files_edge_cases() {
        let (_dir, mut dispatcher) = dispatcher();
        dispatcher.engine_mut().change_directory("tmp").await;

        let result = dispatcher.execute_tool("list_files", &Map::new()).await;
        assert_eq!(result.content(), "Directory is empty");

        std::fs::write(
            dispatcher.engine().current_directory().join("f.txt"),
            "x",
        )
        .unwrap();
        let result = dispatcher
            .execute_tool("list_files", &params(json!({"path": "f.txt"})))
            .await;
        assert_eq!(result.content(), "Not a directory: f.txt");
    }

    #[tokio::test]
    async fn test_create_and_delete() {
        let (_dir, mut dispatcher) = dispatcher();

        let result = dispatcher
            .execute_tool("create_directory", &params(json!({"path": "a/b"})))
            .await;
        assert_eq!(result.content(), "Directory created: a/b");

        let result = dispatcher
            .execute_tool("create_directory", &params(json!({"path": "a/b"})))
            .await;
        assert!(result.content().starts_with("Failed to create directory: a/b"));

        let result = dispatcher
            .execute_tool("delete_file", &params(json!({"path": "a"})))
            .await;
        assert_eq!(result.content(), "Deleted: a");

        let result = dispatcher
            .execute_tool("delete_file", &params(json!({"path": "a"})))
            .await;
        assert!(result.content().starts_with("Failed to delete: a"));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let (_dir, mut dispatcher) = dispatcher();
        let result = dispatcher
            .execute_tool("read_file", &params(json!({"path": "nope.txt"})))
            .await;
        assert!(result.is_error());
        assert!(result.content().starts_with("Failed to read file: nope.txt"));
    }

    #[test]
    fn test_as_change_directory() {
        assert_eq!(as_change_directory("cd src"), Some("src"));
        assert_eq!(as_change_directory("  cd  "), Some("~"));
        assert_eq!(as_change_directory("cd src && make"), None);
        assert_eq!(as_change_directory("cdrecord"), None);
        assert_eq!(as_change_directory("ls"), None);
    }
}

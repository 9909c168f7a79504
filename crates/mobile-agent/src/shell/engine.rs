use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use super::builtins::Builtin;
use crate::config::{Directories, DEFAULT_COMMAND_TIMEOUT_SECS};
use crate::process_store;

/// Exit code reported when a native command is killed for running too long
pub const TIMEOUT_EXIT_CODE: i32 = 124;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn ok<S: Into<String>>(stdout: S) -> Self {
        CommandResult {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn failure<S: Into<String>>(stderr: S) -> Self {
        CommandResult {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: 1,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs command lines relative to a tracked working directory.
///
/// The working directory only changes through [`CommandEngine::change_directory`]; a native
/// `cd` inside `execute` affects nothing beyond its own subprocess.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    current_directory: PathBuf,
    directories: Directories,
    timeout: Duration,
}

impl CommandEngine {
    pub fn new(directories: Directories) -> Self {
        CommandEngine {
            current_directory: directories.home.clone(),
            directories,
            timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn current_directory(&self) -> &Path {
        &self.current_directory
    }

    pub fn directories(&self) -> &Directories {
        &self.directories
    }

    /// Resolve a user supplied path against the current directory, expanding a leading `~`
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = path.trim();
        let joined = if path.is_empty() {
            self.current_directory.clone()
        } else if path == "~" {
            self.directories.home.clone()
        } else if let Some(rest) = path.strip_prefix("~/") {
            self.directories.home.join(rest)
        } else {
            self.current_directory.join(path)
        };
        normalize(&joined)
    }

    pub async fn execute(&self, command_line: &str) -> CommandResult {
        match Builtin::parse(command_line) {
            Some(builtin) => {
                tracing::debug!(builtin = builtin.name(), "running built-in command");
                let cwd = self.current_directory.clone();
                match tokio::task::spawn_blocking(move || builtin.run(&cwd)).await {
                    Ok(result) => result,
                    Err(e) => CommandResult::failure(format!("Error: {}", e)),
                }
            }
            None => self.execute_native(command_line).await,
        }
    }

    /// Change the working directory. State is untouched unless the target is an existing directory.
    pub async fn change_directory(&mut self, path: &str) -> CommandResult {
        let target = self.resolve(path);
        let is_dir = tokio::fs::metadata(&target)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);
        if is_dir {
            tracing::debug!(directory = %target.display(), "changed directory");
            self.current_directory = target;
            CommandResult::ok("")
        } else {
            CommandResult::failure(format!("Directory not found: {}", path.trim()))
        }
    }

    async fn execute_native(&self, command_line: &str) -> CommandResult {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(command_line)
            .current_dir(&self.current_directory)
            .env("HOME", &self.directories.home)
            .env("TMPDIR", &self.directories.tmp)
            .env("PATH", self.search_path());
        run_process(command, self.timeout).await
    }

    fn search_path(&self) -> std::ffi::OsString {
        let mut paths = vec![self.directories.bin.clone()];
        if let Some(existing) = std::env::var_os("PATH") {
            paths.extend(std::env::split_paths(&existing));
        }
        std::env::join_paths(paths).unwrap_or_default()
    }
}

/// Spawn `command` with captured output, registering it with the process store while it runs.
///
/// When `timeout` elapses first the whole process tree is killed and the result carries
/// [`TIMEOUT_EXIT_CODE`].
pub(crate) async fn run_process(mut command: Command, timeout: Duration) -> CommandResult {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = match command.spawn() {
        Ok(child) => child,
        Err(e) => return CommandResult::failure(format!("Error: {}", e)),
    };
    let pid = child.id();
    if let Some(pid) = pid {
        process_store::store_process(pid);
    }

    let output = child.wait_with_output();
    tokio::pin!(output);

    let result = tokio::select! {
        output = &mut output => match output {
            Ok(output) => CommandResult {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(-1),
            },
            Err(e) => CommandResult::failure(format!("Error: {}", e)),
        },
        _ = tokio::time::sleep(timeout) => {
            tracing::warn!(pid, ?timeout, "process timed out");
            // Kill descendants while the parent is still alive to anchor the tree
            if let Some(pid) = pid {
                process_store::kill_process_tree(pid);
            }
            CommandResult {
                stdout: String::new(),
                stderr: format!("Command timed out after {} seconds", timeout.as_secs_f64()),
                exit_code: TIMEOUT_EXIT_CODE,
            }
        }
    };

    if let Some(pid) = pid {
        process_store::remove_process(pid);
    }
    result
}

// Lexical normalization; `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

//! Interpreters for the `run_python` and `run_javascript` tools.
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::DEFAULT_COMMAND_TIMEOUT_SECS;
use crate::errors::{AgentError, AgentResult};
use crate::shell::engine::run_process;

/// A language interpreter that runs a snippet of source code
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Short language name reported in tool metadata
    fn language(&self) -> &'static str;

    /// Human readable name used in failure messages
    fn display_name(&self) -> &'static str;

    /// Run `code` with `cwd` as working directory, returning stdout.
    ///
    /// A non-zero exit is reported as [`AgentError::CommandNonZeroExit`] carrying stderr.
    async fn execute_code(&self, code: &str, cwd: &Path) -> AgentResult<String>;

    /// The interpreter's version string, or `None` when it is not installed
    async fn version(&self) -> Option<String>;
}

/// Writes the snippet to a temp file under the tmp root and runs it with an interpreter
#[derive(Debug, Clone)]
pub struct ScriptRuntime {
    language: &'static str,
    display_name: &'static str,
    interpreter: &'static str,
    prefix: &'static str,
    extension: &'static str,
    tmp_dir: PathBuf,
    timeout: Duration,
}

impl ScriptRuntime {
    pub fn python<P: Into<PathBuf>>(tmp_dir: P) -> Self {
        ScriptRuntime {
            language: "python",
            display_name: "Python",
            interpreter: "python3",
            prefix: "python_",
            extension: ".py",
            tmp_dir: tmp_dir.into(),
            timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    pub fn node<P: Into<PathBuf>>(tmp_dir: P) -> Self {
        ScriptRuntime {
            language: "javascript",
            display_name: "Node.js",
            interpreter: "node",
            prefix: "node_",
            extension: ".js",
            tmp_dir: tmp_dir.into(),
            timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Runtime for ScriptRuntime {
    fn language(&self) -> &'static str {
        self.language
    }

    fn display_name(&self) -> &'static str {
        self.display_name
    }

    async fn execute_code(&self, code: &str, cwd: &Path) -> AgentResult<String> {
        let failed = |e: std::io::Error| {
            AgentError::ToolExecution(format!(
                "Failed to execute {} code: {}",
                self.display_name, e
            ))
        };

        let tmp_dir = self.tmp_dir.clone();
        let (prefix, extension) = (self.prefix, self.extension);
        let code = code.to_string();
        // Removed when dropped at the end of this call
        let script = tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&tmp_dir)?;
            let mut script = tempfile::Builder::new()
                .prefix(prefix)
                .suffix(extension)
                .tempfile_in(&tmp_dir)?;
            script.write_all(code.as_bytes())?;
            script.flush()?;
            Ok::<_, std::io::Error>(script)
        })
        .await
        .map_err(|e| failed(e.into()))?
        .map_err(failed)?;

        let mut command = Command::new(self.interpreter);
        command.arg(script.path()).current_dir(cwd);

        tracing::info!(language = self.language, "running script");
        let result = run_process(command, self.timeout).await;
        if result.success() {
            Ok(result.stdout)
        } else {
            Err(AgentError::CommandNonZeroExit {
                code: result.exit_code,
                stderr: result.stderr,
            })
        }
    }

    async fn version(&self) -> Option<String> {
        command_version(self.interpreter).await
    }
}

async fn command_version(program: &str) -> Option<String> {
    let output = Command::new(program).arg("--version").output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    // python2 printed its version on stderr
    let text = if output.stdout.is_empty() {
        output.stderr
    } else {
        output.stdout
    };
    Some(String::from_utf8_lossy(&text).trim().to_string())
}

/// The Python and Node runtimes, sharing one tmp root
#[derive(Debug, Clone)]
pub struct RuntimeManager {
    pub python: ScriptRuntime,
    pub node: ScriptRuntime,
}

impl RuntimeManager {
    pub fn new<P: Into<PathBuf>>(tmp_dir: P, timeout: Duration) -> Self {
        let tmp_dir = tmp_dir.into();
        RuntimeManager {
            python: ScriptRuntime::python(tmp_dir.clone()).with_timeout(timeout),
            node: ScriptRuntime::node(tmp_dir).with_timeout(timeout),
        }
    }

    /// Installed versions of `python`, `node` and `npm`; `None` for the missing ones
    pub async fn check_available(&self) -> BTreeMap<&'static str, Option<String>> {
        let mut versions = BTreeMap::new();
        versions.insert("python", self.python.version().await);
        versions.insert("node", self.node.version().await);
        versions.insert("npm", command_version("npm").await);
        versions
    }
}

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{AgentError, AgentResult};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_HOST: &str = "https://api.anthropic.com";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_HOME: &str = "~/.mobile-agent/home";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_ITERATIONS: usize = 25;

const ENV_PREFIX: &str = "MOBILE_AGENT";
const FALLBACK_API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Everything the agent needs from its environment, constructed once and passed down
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_home")]
    pub home_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmp_dir: Option<PathBuf>,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

/// The directory roots the shell and runtimes work in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directories {
    pub home: PathBuf,
    pub bin: PathBuf,
    pub tmp: PathBuf,
}

impl Directories {
    pub fn from_home<P: Into<PathBuf>>(home: P) -> Self {
        let home = home.into();
        Directories {
            bin: home.join("bin"),
            tmp: home.join("tmp"),
            home,
        }
    }

    /// Create the roots if they are missing
    pub fn ensure(&self) -> AgentResult<()> {
        for dir in [&self.home, &self.bin, &self.tmp] {
            std::fs::create_dir_all(dir).map_err(|e| {
                AgentError::Config(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

impl AgentConfig {
    /// A config with defaults for everything except the key
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        AgentConfig {
            api_key: api_key.into(),
            model: default_model(),
            host: default_host(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            home_dir: default_home(),
            bin_dir: None,
            tmp_dir: None,
            command_timeout_secs: default_command_timeout_secs(),
            max_iterations: default_max_iterations(),
        }
    }

    pub fn with_home<P: Into<PathBuf>>(mut self, home: P) -> Self {
        self.home_dir = home.into();
        self
    }

    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    /// Load defaults, then the config file (if any), then `MOBILE_AGENT_*` environment variables
    pub fn load(config_file: Option<&Path>) -> AgentResult<Self> {
        let mut builder = Config::builder()
            .set_default("model", DEFAULT_MODEL)?
            .set_default("host", DEFAULT_HOST)?
            .set_default("max_tokens", DEFAULT_MAX_TOKENS as i64)?
            .set_default("temperature", DEFAULT_TEMPERATURE as f64)?
            .set_default("home_dir", DEFAULT_HOME)?
            .set_default("command_timeout_secs", DEFAULT_COMMAND_TIMEOUT_SECS as i64)?
            .set_default("max_iterations", DEFAULT_MAX_ITERATIONS as i64)?;

        if let Ok(key) = std::env::var(FALLBACK_API_KEY_VAR) {
            builder = builder.set_default("api_key", key)?;
        }

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        match config.try_deserialize::<AgentConfig>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if error_str.starts_with("missing field") {
                    let field = error_str
                        .trim_start_matches("missing field `")
                        .trim_end_matches('`');
                    Err(missing(field))
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(missing(field))
                } else {
                    Err(err.into())
                }
            }
        }
    }

    /// The default location of the config file, `$XDG_CONFIG_HOME/mobile-agent/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mobile-agent").join("config.yaml"))
    }

    pub fn directories(&self) -> Directories {
        let home = expand(&self.home_dir);
        let mut directories = Directories::from_home(home);
        if let Some(bin) = &self.bin_dir {
            directories.bin = expand(bin);
        }
        if let Some(tmp) = &self.tmp_dir {
            directories.tmp = expand(tmp);
        }
        directories
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

impl From<config::ConfigError> for AgentError {
    fn from(err: config::ConfigError) -> Self {
        AgentError::Config(err.to_string())
    }
}

pub fn to_env_var(field: &str) -> String {
    format!("{}_{}", ENV_PREFIX, field.to_uppercase())
}

fn missing(field: &str) -> AgentError {
    AgentError::Config(format!("{} is not set; export {}", field, to_env_var(field)))
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_home() -> PathBuf {
    PathBuf::from(DEFAULT_HOME)
}

fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

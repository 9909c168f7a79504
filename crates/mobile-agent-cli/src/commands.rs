pub mod configure;
pub mod run;
pub mod session;
pub mod shell;

use anyhow::{Context, Result};
use std::path::PathBuf;

use mobile_agent::config::AgentConfig;

pub fn load_config(config_path: Option<&PathBuf>) -> Result<AgentConfig> {
    AgentConfig::load(config_path.map(|p| p.as_path()))
        .context("Could not load configuration, try running `magent configure`")
}

use anyhow::{anyhow, Context, Result};
use cliclack::spinner;
use console::style;
use std::fs;
use std::path::{Path, PathBuf};

use mobile_agent::config::{AgentConfig, DEFAULT_HOME, DEFAULT_MODEL};
use mobile_agent::models::message::Message;
use mobile_agent::providers::anthropic::AnthropicProvider;
use mobile_agent::providers::base::Provider;
use mobile_agent::providers::configs::AnthropicProviderConfig;

pub async fn handle_configure(
    config_path: Option<PathBuf>,
    provided_api_key: Option<String>,
    provided_model: Option<String>,
    provided_home: Option<PathBuf>,
) -> Result<()> {
    let config_path =
        config_path.ok_or_else(|| anyhow!("Could not determine where to write the config"))?;
    cliclack::intro(style(" configure mobile-agent ").on_cyan().black())?;

    // Use values from an existing file as defaults
    let existing = read_existing(&config_path);
    if existing.is_some() {
        let _ = cliclack::log::info(format!(
            "We are updating the existing config at {}",
            config_path.display()
        ));
    }

    let saved_key = existing
        .as_ref()
        .map(|c| c.api_key.clone())
        .filter(|key| !key.is_empty());
    let api_key = match (provided_api_key, saved_key) {
        (Some(key), _) => key,
        (None, Some(current))
            if !cliclack::confirm("An API key is already saved. Replace it?")
                .initial_value(false)
                .interact()? =>
        {
            current
        }
        (None, _) => cliclack::password("Enter your Anthropic API key")
            .mask('▪')
            .interact()?,
    };

    let model = match provided_model {
        Some(model) => model,
        None => {
            let default_model = existing.as_ref().map_or(DEFAULT_MODEL, |c| c.model.as_str());
            cliclack::input("Which model should the agent use?")
                .default_input(default_model)
                .interact()?
        }
    };

    let home = match provided_home {
        Some(home) => home,
        None => {
            let default_home = existing
                .as_ref()
                .map(|c| c.home_dir.display().to_string())
                .unwrap_or_else(|| DEFAULT_HOME.to_string());
            let home: String = cliclack::input("Where should the agent keep its files?")
                .default_input(&default_home)
                .interact()?;
            PathBuf::from(home)
        }
    };

    let mut config = existing.unwrap_or_else(|| AgentConfig::new(String::new()));
    config.api_key = api_key;
    config.model = model;
    config.home_dir = home;

    // Confirm everything is configured correctly by calling the model
    let spin = spinner();
    spin.start("Checking your configuration...");
    match check_connection(&config).await {
        Ok(text) => spin.stop(text),
        Err(e) => {
            spin.stop(format!("We could not connect: {}", e));
            let _ = cliclack::outro("Try rerunning configure and check your API key.");
            return Ok(());
        }
    }

    match save_config(&config_path, &config) {
        Ok(()) => cliclack::outro(format!("Config saved to: {}", config_path.display()))?,
        Err(e) => cliclack::outro(format!("Failed to save config: {:#}", e))?,
    }
    Ok(())
}

async fn check_connection(config: &AgentConfig) -> Result<String> {
    let provider = AnthropicProvider::new(AnthropicProviderConfig::from(config))?;
    let message = Message::user_text(
        "Please give a nice welcome message (one sentence) and let them know they are all set to use this agent",
    );
    let response = provider
        .complete(
            "You are an agent that works inside a small device sandbox.",
            &[message],
            &[],
        )
        .await?;
    let text = response
        .content
        .iter()
        .filter_map(|block| block.as_text())
        .collect::<Vec<_>>()
        .concat();
    Ok(if text.is_empty() {
        "No response text available".to_string()
    } else {
        text
    })
}

fn read_existing(path: &Path) -> Option<AgentConfig> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&contents) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Ignoring unreadable config {}: {}", path.display(), e);
            None
        }
    }
}

fn save_config(path: &Path, config: &AgentConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let yaml = serde_yaml::to_string(config)?;
    fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

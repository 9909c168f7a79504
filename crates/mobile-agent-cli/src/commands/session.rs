use anyhow::{Context, Result};
use std::fs::File;
use std::path::PathBuf;

use super::load_config;
use crate::history::history_file;
use crate::prompt::rustyline::RustylinePrompt;
use crate::session::message_serialize::deserialize_messages;
use crate::session::session_file::{ensure_session_dir, new_session_file};
use crate::session::Session;
use mobile_agent::agent::Agent;

pub fn build_agent(config_path: Option<&PathBuf>) -> Result<Agent> {
    let config = load_config(config_path)?;
    Agent::from_config(&config).context("Failed to start the agent")
}

pub async fn handle_session(config_path: Option<PathBuf>, resume: Option<PathBuf>) -> Result<()> {
    let mut agent = build_agent(config_path.as_ref())?;

    let session_file = match resume {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open session file {}", path.display()))?;
            let messages = deserialize_messages(file)
                .with_context(|| format!("Failed to read session file {}", path.display()))?;
            println!("Resuming {} messages from {}", messages.len(), path.display());
            agent = agent.with_history(messages);
            path
        }
        None => new_session_file(&ensure_session_dir()?),
    };

    let prompt = RustylinePrompt::new(history_file("session"))?;
    let mut session = Session::new(agent, Box::new(prompt), session_file);
    session.start().await
}

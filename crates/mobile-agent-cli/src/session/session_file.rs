use anyhow::{Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use mobile_agent::models::message::Message;

pub fn ensure_session_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("mobile-agent")
        .join("sessions");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create {}", config_dir.display()))?;
    }

    Ok(config_dir)
}

/// A fresh transcript path such as `<dir>/session-x3Fq9aLp.jsonl`
pub fn new_session_file(dir: &Path) -> PathBuf {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    dir.join(format!("session-{}.jsonl", suffix))
}

pub fn persist_messages(session_file: &Path, messages: &[Message]) -> Result<()> {
    let file = File::create(session_file)?; // Create or truncate the file
    persist_messages_internal(file, messages)
}

pub fn persist_messages_internal(session_file: File, messages: &[Message]) -> Result<()> {
    let mut writer = std::io::BufWriter::new(session_file);

    for message in messages {
        serde_json::to_writer(&mut writer, &message)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

use anyhow::Result;
use std::fs::File;
use std::io::{self, BufRead};

use mobile_agent::models::message::Message;

/// Read a transcript written by `persist_messages`, one message per line
pub fn deserialize_messages(file: File) -> Result<Vec<Message>> {
    let reader = io::BufReader::new(file);
    let mut messages = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        messages.push(serde_json::from_str::<Message>(&line)?);
    }

    Ok(messages)
}

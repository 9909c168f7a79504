use anyhow::Result;
use std::path::PathBuf;

use super::session::build_agent;
use crate::prompt::rustyline::RustylinePrompt;
use crate::session::session_file::{ensure_session_dir, new_session_file};
use crate::session::Session;

/// One prompt, no REPL. The transcript is still recorded.
pub async fn handle_run(config_path: Option<PathBuf>, prompt_text: String) -> Result<()> {
    let agent = build_agent(config_path.as_ref())?;
    let session_file = new_session_file(&ensure_session_dir()?);

    let prompt = RustylinePrompt::new(None)?;
    let mut session = Session::new(agent, Box::new(prompt), session_file);
    session.headless_start(&prompt_text).await
}

use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::prompt::{InputType, Prompt};
use crate::session::session_file::persist_messages;
use mobile_agent::agent::{Agent, ToolEvent};
use mobile_agent::process_store;

pub struct Session<'a> {
    agent: Agent,
    prompt: Box<dyn Prompt + 'a>,
    session_file: PathBuf,
}

impl<'a> Session<'a> {
    pub fn new(agent: Agent, prompt: Box<dyn Prompt + 'a>, session_file: PathBuf) -> Self {
        Session {
            agent,
            prompt,
            session_file,
        }
    }

    pub async fn start(&mut self) -> Result<()> {
        self.setup_session();

        loop {
            let input = self.prompt.get_input()?;
            match input.input_type {
                InputType::Message => {
                    if let Some(content) = input.content {
                        self.prompt.show_busy();
                        self.agent_process_message(&content).await;
                    }
                }
                InputType::Clear => {
                    self.agent.clear_history();
                    self.persist();
                    println!("Started a fresh conversation.");
                }
                InputType::Exit => break,
                InputType::AskAgain => continue,
            }
        }
        self.close_session();
        Ok(())
    }

    pub async fn headless_start(&mut self, initial_message: &str) -> Result<()> {
        self.prompt.show_busy();
        self.agent_process_message(initial_message).await;
        self.prompt.close();
        Ok(())
    }

    async fn agent_process_message(&mut self, text: &str) {
        let (tx, mut rx) = mpsc::unbounded_channel::<ToolEvent>();
        let mark = self.agent.history_len();

        let reply = {
            let run = self.agent.run(text, &tx);
            tokio::pin!(run);
            loop {
                tokio::select! {
                    reply = &mut run => break Some(reply),
                    Some(event) = rx.recv() => {
                        self.prompt.hide_busy();
                        self.prompt.render_event(&event);
                        self.prompt.show_busy();
                    }
                    _ = tokio::signal::ctrl_c() => {
                        // Kill while the run still owns its children so whole trees go down
                        let killed = process_store::kill_processes();
                        tracing::info!(killed, "interrupted agent run");
                        break None;
                    }
                }
            }
        };
        self.prompt.hide_busy();

        // Events sent right before the run finished
        while let Ok(event) = rx.try_recv() {
            self.prompt.render_event(&event);
        }

        match reply {
            Some(reply) => self.prompt.render_text(&reply),
            None => {
                // Resets the conversation to before the interrupted user request
                self.agent.rewind(mark);
                println!(" Interrupt: Resetting conversation to before the last sent message...");
            }
        }
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = persist_messages(&self.session_file, &self.agent.history()) {
            eprintln!("Failed to persist messages: {}", e);
        }
    }

    fn setup_session(&mut self) {
        println!(
            "Starting session. Recording to {}",
            self.session_file.display()
        );
        println!(
            "Working in {}",
            self.agent.engine().current_directory().display()
        );
        self.prompt.agent_ready();
    }

    fn close_session(&mut self) {
        println!(
            "Closing session. Recorded to {}",
            self.session_file.display()
        );
        self.prompt.close();
    }
}

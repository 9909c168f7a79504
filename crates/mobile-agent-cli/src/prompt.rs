use anyhow::Result;
use mobile_agent::agent::ToolEvent;

pub mod rustyline;
pub mod thinking;

pub trait Prompt {
    fn render_text(&mut self, text: &str);
    fn render_event(&mut self, event: &ToolEvent);
    fn get_input(&mut self) -> Result<Input>;
    fn show_busy(&mut self);
    fn hide_busy(&self);
    fn close(&mut self);
    fn agent_ready(&self) {
        println!("\n");
        println!("The agent is running! Enter your instructions, or type /help for commands.");
        println!("\n");
    }
}

pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // Only set for messages
}

#[derive(Debug, PartialEq, Eq)]
pub enum InputType {
    AskAgain, // Ask the user for input again. Control flow command.
    Message,  // User sent a message
    Clear,    // User wants a fresh conversation
    Exit,     // User wants to exit the session
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn bat_theme(&self) -> &'static str {
        match self {
            Theme::Light => "GitHub",
            Theme::Dark => "zenburn",
        }
    }

    pub fn toggle(&self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

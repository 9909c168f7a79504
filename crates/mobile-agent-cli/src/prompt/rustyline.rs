use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use bat::WrappingMode;
use cliclack::spinner;
use console::style;
use mobile_agent::agent::ToolEvent;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::{thinking::get_random_thinking_message, Input, InputType, Prompt, Theme};
use crate::history;

const PROMPT: &str = "\x1b[1m\x1b[38;5;30m( >_)> \x1b[0m";
const MAX_OUTPUT_LINES: usize = 20;
const ERROR_PREFIX: &str = "Error: ";

pub struct RustylinePrompt {
    spinner: cliclack::ProgressBar,
    theme: Theme,
    editor: DefaultEditor,
    history_file: Option<PathBuf>,
}

impl RustylinePrompt {
    pub fn new(history_file: Option<PathBuf>) -> Result<Self> {
        let mut editor = DefaultEditor::with_config(history::editor_config()?)?;
        history::load(&mut editor, history_file.as_deref());

        Ok(RustylinePrompt {
            spinner: spinner(),
            theme: Theme::Dark,
            editor,
            history_file,
        })
    }
}

fn print_markdown(content: &str, theme: &str) {
    let result = bat::PrettyPrinter::new()
        .input(bat::Input::from_bytes(content.as_bytes()))
        .theme(theme)
        .language("Markdown")
        .wrapping_mode(WrappingMode::Character)
        .print();
    if let Err(e) = result {
        tracing::debug!("bat failed to render: {}", e);
        println!("{}", content);
    }
}

fn print_tool_header(name: &str) {
    let tool_header = format!(
        "─── {} ──────────────────────────",
        style(name).magenta().dim(),
    );
    println!();
    println!("{}", tool_header);
}

/// Keep long tool output from flooding the terminal
fn truncate_lines(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() <= max_lines {
        return output.trim_end().to_string();
    }
    format!(
        "{}\n... ({} more lines)",
        lines[..max_lines].join("\n"),
        lines.len() - max_lines
    )
}

fn print_tool_output(summary: &str) {
    if let Some(message) = summary.strip_prefix(ERROR_PREFIX) {
        println!("{}", style(truncate_lines(message, MAX_OUTPUT_LINES)).red());
    } else if summary.trim().is_empty() {
        println!("{}", style("(no output)").dim());
    } else {
        println!("{}", style(truncate_lines(summary, MAX_OUTPUT_LINES)).dim());
    }
}

fn print_help() {
    println!("Commands:");
    println!("/exit | /quit - Exit the session");
    println!("/clear - Start a fresh conversation");
    println!("/t - Toggle Light/Dark theme");
    println!("/? | /help - Display this help message");
    println!("Ctrl+C - Interrupt the agent (kills running commands and forgets the interrupted request)");
}

/// Map a line of user input to what the session should do with it
fn parse_input(line: &str) -> InputType {
    let line = line.trim();
    if line.is_empty() {
        InputType::AskAgain
    } else if line.eq_ignore_ascii_case("/exit") || line.eq_ignore_ascii_case("/quit") {
        InputType::Exit
    } else if line.eq_ignore_ascii_case("/clear") {
        InputType::Clear
    } else if line.eq_ignore_ascii_case("/t")
        || line.eq_ignore_ascii_case("/?")
        || line.eq_ignore_ascii_case("/help")
    {
        InputType::AskAgain
    } else {
        InputType::Message
    }
}

impl Prompt for RustylinePrompt {
    fn render_text(&mut self, text: &str) {
        print_markdown(text, self.theme.bat_theme());
        println!();
        let _ = io::stdout().flush();
    }

    fn render_event(&mut self, event: &ToolEvent) {
        match event {
            ToolEvent::Started { name } => print_tool_header(name),
            ToolEvent::Finished { summary, .. } => print_tool_output(summary),
        }
        let _ = io::stdout().flush();
    }

    fn show_busy(&mut self) {
        self.spinner = spinner();
        self.spinner
            .start(format!("{}...", get_random_thinking_message()));
    }

    fn hide_busy(&self) {
        self.spinner.stop("");
    }

    fn get_input(&mut self) -> Result<Input> {
        let message_text = match self.editor.readline(PROMPT) {
            Ok(text) => text.trim().to_string(),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                return Ok(Input {
                    input_type: InputType::Exit,
                    content: None,
                });
            }
            Err(e) => {
                eprintln!("Input error: {}", e);
                return Ok(Input {
                    input_type: InputType::Exit,
                    content: None,
                });
            }
        };

        let input_type = parse_input(&message_text);
        if message_text.eq_ignore_ascii_case("/t") {
            self.theme = self.theme.toggle();
            println!("Switched to {:?} theme", self.theme);
        } else if message_text.eq_ignore_ascii_case("/?")
            || message_text.eq_ignore_ascii_case("/help")
        {
            print_help();
        }

        let content = (input_type == InputType::Message).then_some(message_text);
        Ok(Input {
            input_type,
            content,
        })
    }

    fn close(&mut self) {
        history::save(&mut self.editor, self.history_file.as_deref());
    }
}

use anyhow::{Context as _, Result};
use console::{style, Term};
use std::borrow::Cow;
use std::path::PathBuf;

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::{DefaultHistory, History, SearchDirection};
use rustyline::validate::Validator;
use rustyline::{CompletionType, Context, Editor, Helper};

use super::load_config;
use crate::history;
use mobile_agent::config::AgentConfig;
use mobile_agent::process_store;
use mobile_agent::runtime::RuntimeManager;
use mobile_agent::shell::completion::{complete, suggestions, word_start};
use mobile_agent::shell::{CommandEngine, CommandResult};

/// Completes command names and paths relative to the engine's working directory
struct ShellHelper {
    cwd: PathBuf,
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];
        let candidates = suggestions(input, &self.cwd)
            .into_iter()
            .map(|s| Pair {
                display: s.clone(),
                replacement: s,
            })
            .collect();
        Ok((word_start(input), candidates))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() || line.is_empty() {
            return None;
        }
        let completed = complete(line, &self.cwd);
        completed
            .strip_prefix(line)
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }
}

impl Highlighter for ShellHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(style(hint).dim().to_string())
    }
}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

/// What a line typed at the shell prompt asks for
#[derive(Debug, PartialEq, Eq)]
enum ShellInput<'a> {
    Empty,
    Exit,
    Help,
    Clear,
    History,
    Runtimes,
    Cd(&'a str),
    Command(&'a str),
}

fn parse_line(line: &str) -> ShellInput<'_> {
    let line = line.trim();
    match line {
        "" => ShellInput::Empty,
        "exit" | "quit" => ShellInput::Exit,
        "help" => ShellInput::Help,
        "clear" => ShellInput::Clear,
        "history" => ShellInput::History,
        "runtimes" => ShellInput::Runtimes,
        "cd" => ShellInput::Cd("~"),
        _ => match line.strip_prefix("cd ") {
            Some(target) if !target.trim().contains(' ') => ShellInput::Cd(target.trim()),
            _ => ShellInput::Command(line),
        },
    }
}

fn prompt_for(engine: &CommandEngine) -> String {
    let cwd = engine.current_directory();
    let home = &engine.directories().home;
    let shown = match cwd.strip_prefix(home) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => cwd.display().to_string(),
    };
    format!("{} $ ", style(shown).cyan().bold())
}

fn print_result(result: &CommandResult) {
    if !result.stdout.is_empty() {
        print!("{}", result.stdout);
        if !result.stdout.ends_with('\n') {
            println!();
        }
    }
    if !result.stderr.is_empty() {
        eprintln!("{}", style(result.stderr.trim_end()).red());
    }
    if !result.success() {
        println!("{}", style(format!("exit code {}", result.exit_code)).dim());
    }
}

fn print_help() {
    println!("Built-in commands: ls, pwd, cat, echo, mkdir, touch, rm, cp, mv");
    println!("Anything else runs through `sh -c` in the current directory.");
    println!();
    println!("cd [dir] - Change directory (defaults to home)");
    println!("history - Show previous commands");
    println!("runtimes - Show installed Python, Node.js and npm versions");
    println!("clear - Clear the screen");
    println!("exit - Leave the shell");
    println!("Ctrl+C - Kill the running command");
}

fn print_history(history: &DefaultHistory) {
    for index in 0..history.len() {
        if let Ok(Some(entry)) = history.get(index, SearchDirection::Forward) {
            println!("{:>4}  {}", index + 1, entry.entry);
        }
    }
}

async fn print_runtimes(runtimes: &RuntimeManager) {
    for (name, version) in runtimes.check_available().await {
        match version {
            Some(version) => println!("{:<8}{}", name, style(version).green()),
            None => println!("{:<8}{}", name, style("not installed").dim()),
        }
    }
}

// The shell never talks to the model, so a config without an API key is fine here
fn shell_config(config_path: Option<&PathBuf>) -> AgentConfig {
    match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Using default settings: {:#}", e);
            AgentConfig::new(String::new())
        }
    }
}

async fn run_command(engine: &CommandEngine, line: &str) -> Option<CommandResult> {
    let execution = engine.execute(line);
    tokio::pin!(execution);
    tokio::select! {
        result = &mut execution => Some(result),
        _ = tokio::signal::ctrl_c() => {
            let killed = process_store::kill_processes();
            tracing::info!(killed, "interrupted command");
            None
        }
    }
}

pub async fn handle_shell(config_path: Option<PathBuf>) -> Result<()> {
    let config = shell_config(config_path.as_ref());
    let directories = config.directories();
    directories
        .ensure()
        .context("Failed to prepare the home directory")?;

    let mut engine = CommandEngine::new(directories.clone()).with_timeout(config.command_timeout());
    let runtimes = RuntimeManager::new(directories.tmp.clone(), config.command_timeout());

    let editor_config = history::editor_builder()?
        .completion_type(CompletionType::List)
        .build();
    let mut editor: Editor<ShellHelper, DefaultHistory> = Editor::with_config(editor_config)?;
    editor.set_helper(Some(ShellHelper {
        cwd: engine.current_directory().to_path_buf(),
    }));
    let history_file = history::history_file("shell");
    history::load(&mut editor, history_file.as_deref());

    println!(
        "{} {}",
        style("mobile-agent shell").bold(),
        style("- type `help` for commands, `exit` to leave").dim()
    );

    loop {
        let line = match editor.readline(&prompt_for(&engine)) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        };

        match parse_line(&line) {
            ShellInput::Empty => {}
            ShellInput::Exit => break,
            ShellInput::Help => print_help(),
            ShellInput::Clear => {
                if let Err(e) = Term::stdout().clear_screen() {
                    tracing::debug!("Failed to clear the screen: {}", e);
                }
            }
            ShellInput::History => print_history(editor.history()),
            ShellInput::Runtimes => print_runtimes(&runtimes).await,
            ShellInput::Cd(target) => {
                let result = engine.change_directory(target).await;
                print_result(&result);
                if let Some(helper) = editor.helper_mut() {
                    helper.cwd = engine.current_directory().to_path_buf();
                }
            }
            ShellInput::Command(command) => match run_command(&engine, command).await {
                Some(result) => print_result(&result),
                None => println!("{}", style("Interrupted").yellow()),
            },
        }
    }

    history::save(&mut editor, history_file.as_deref());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mobile_agent::config::Directories;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("   "), ShellInput::Empty);
        assert_eq!(parse_line("exit"), ShellInput::Exit);
        assert_eq!(parse_line("history"), ShellInput::History);
        assert_eq!(parse_line("runtimes"), ShellInput::Runtimes);
        assert_eq!(parse_line("cd"), ShellInput::Cd("~"));
        assert_eq!(parse_line("cd  src "), ShellInput::Cd("src"));
        assert_eq!(parse_line("cd a b"), ShellInput::Command("cd a b"));
        assert_eq!(parse_line("ls -la"), ShellInput::Command("ls -la"));
    }

    #[tokio::test]
    async fn test_prompt_shows_home_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        let mut engine = CommandEngine::new(Directories::from_home(dir.path()));

        assert!(console::strip_ansi_codes(&prompt_for(&engine)).starts_with("~ $"));
        engine.change_directory("src").await;
        assert!(console::strip_ansi_codes(&prompt_for(&engine)).starts_with("~/src $"));
    }

    #[test]
    fn test_hint_extends_to_common_prefix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes_one.txt"), "").unwrap();
        std::fs::write(dir.path().join("notes_two.txt"), "").unwrap();
        let helper = ShellHelper {
            cwd: dir.path().to_path_buf(),
        };
        let history = DefaultHistory::new();
        let ctx = Context::new(&history);

        assert_eq!(helper.hint("cat no", 6, &ctx), Some("tes_".to_string()));
        assert_eq!(helper.hint("cat zz", 6, &ctx), None);

        let (start, candidates) = Completer::complete(&helper, "cat no", 6, &ctx).unwrap();
        assert_eq!(start, 4);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_shell_config_without_key_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.yaml");
        let config = shell_config(Some(&path));
        assert_eq!(config.command_timeout_secs, 120);
    }
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod history;
mod prompt;
mod session;

use commands::configure::handle_configure;
use commands::run::handle_run;
use commands::session::handle_session;
use commands::shell::handle_shell;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a YAML config file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive session with the agent
    #[command(about = "Start an interactive agent session")]
    Session {
        /// Continue from a transcript written by an earlier session
        #[arg(short, long)]
        resume: Option<PathBuf>,
    },

    /// Send a single prompt and print the reply
    #[command(about = "Run a single prompt headlessly")]
    Run {
        /// The prompt text
        #[arg(required = true)]
        prompt: Vec<String>,
    },

    /// Use the command engine directly, without a model
    #[command(about = "Start an interactive terminal")]
    Shell,

    /// Write a config file
    #[command(about = "Configure the API key, model and home directory")]
    Configure {
        #[arg(long)]
        api_key: Option<String>,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(long)]
        home: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli
        .config
        .or_else(mobile_agent::config::AgentConfig::default_path);

    match cli.command {
        Some(Command::Run { prompt }) => handle_run(config_path, prompt.join(" ")).await,
        Some(Command::Shell) => handle_shell(config_path).await,
        Some(Command::Configure {
            api_key,
            model,
            home,
        }) => handle_configure(config_path, api_key, model, home).await,
        Some(Command::Session { resume }) => handle_session(config_path, resume).await,
        None => handle_session(config_path, None).await,
    }
}

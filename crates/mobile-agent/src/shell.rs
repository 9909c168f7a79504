//! The command engine behind the `execute_command` tool and the interactive terminal.
//!
//! A handful of common commands are emulated directly against the file system; everything else
//! is handed to `sh -c` in the engine's working directory.
pub mod builtins;
pub mod completion;
pub mod engine;

pub use engine::{CommandEngine, CommandResult};

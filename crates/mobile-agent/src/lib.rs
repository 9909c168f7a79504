pub mod agent;
pub mod config;
pub mod conversation;
pub mod errors;
pub mod fs;
pub mod models;
pub mod process_store;
pub mod prompt_template;
pub mod providers;
pub mod runtime;
pub mod shell;
pub mod tools;

use std::path::{Path, PathBuf};

use rustyline::config::Builder;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor, Helper};

pub const MAX_HISTORY: usize = 500;

/// Editor settings shared by the session and shell REPLs
pub fn editor_builder() -> rustyline::Result<Builder> {
    Ok(Config::builder()
        .max_history_size(MAX_HISTORY)?
        .history_ignore_dups(true)?
        .auto_add_history(true))
}

pub fn editor_config() -> rustyline::Result<Config> {
    Ok(editor_builder()?.build())
}

/// `<config dir>/mobile-agent/<name>_history`
pub fn history_file(name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|dir| history_file_in(&dir, name))
}

fn history_file_in(config_dir: &Path, name: &str) -> PathBuf {
    config_dir
        .join("mobile-agent")
        .join(format!("{}_history", name))
}

pub fn load<H: Helper>(editor: &mut Editor<H, DefaultHistory>, path: Option<&Path>) {
    let Some(path) = path else { return };
    // A missing file just means a first run
    if path.exists() {
        if let Err(e) = editor.load_history(path) {
            tracing::warn!("Failed to load history from {}: {}", path.display(), e);
        }
    }
}

pub fn save<H: Helper>(editor: &mut Editor<H, DefaultHistory>, path: Option<&Path>) {
    let Some(path) = path else { return };
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create {}: {}", parent.display(), e);
            return;
        }
    }
    if let Err(e) = editor.save_history(path) {
        tracing::warn!("Failed to save history to {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustyline::history::History;

    #[test]
    fn test_history_file_location() {
        let path = history_file_in(Path::new("/cfg"), "shell");
        assert_eq!(path, PathBuf::from("/cfg/mobile-agent/shell_history"));
    }

    #[test]
    fn test_history_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session_history");

        let mut editor: Editor<(), DefaultHistory> =
            Editor::with_config(editor_config().unwrap()).unwrap();
        editor.add_history_entry("ls").unwrap();
        editor.add_history_entry("pwd").unwrap();
        save(&mut editor, Some(&path));
        assert!(path.is_file());

        let mut restored: Editor<(), DefaultHistory> =
            Editor::with_config(editor_config().unwrap()).unwrap();
        load(&mut restored, Some(&path));
        assert_eq!(restored.history().len(), 2);
    }

    #[test]
    fn test_duplicates_are_ignored() {
        let mut editor: Editor<(), DefaultHistory> =
            Editor::with_config(editor_config().unwrap()).unwrap();
        editor.add_history_entry("ls").unwrap();
        editor.add_history_entry("ls").unwrap();
        assert_eq!(editor.history().len(), 1);
    }
}

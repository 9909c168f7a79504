use std::fs;
use std::path::Path;

const MAX_COMMAND_SUGGESTIONS: usize = 5;
const MAX_FILE_SUGGESTIONS: usize = 10;

pub const COMMANDS: &[&str] = &[
    "ls", "cd", "pwd", "cat", "echo", "mkdir", "rm", "cp", "mv", "touch", "chmod", "chown",
    "grep", "find", "sed", "awk", "sort", "uniq", "wc", "head", "tail", "diff", "tar", "gzip",
    "gunzip", "zip", "unzip", "wget", "curl", "ssh", "scp", "rsync", "git", "npm", "pip",
    "python", "node", "java", "clear", "help", "exit", "history",
];

/// Suggestions for the word under the cursor at the end of `input`.
///
/// The first word completes against [`COMMANDS`]; later words complete against entries of the
/// directory they name, relative to `cwd`. File suggestions keep the typed directory part so they
/// can replace the last word directly, and directories end in `/`.
pub fn suggestions(input: &str, cwd: &Path) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    match input.rsplit_once(' ') {
        None => COMMANDS
            .iter()
            .filter(|command| command.starts_with(input))
            .take(MAX_COMMAND_SUGGESTIONS)
            .map(|command| command.to_string())
            .collect(),
        Some((_, last)) => file_suggestions(last, cwd),
    }
}

/// Extend `input` by the longest prefix shared by all suggestions
pub fn complete(input: &str, cwd: &Path) -> String {
    let candidates = suggestions(input, cwd);
    if candidates.is_empty() {
        return input.to_string();
    }

    let prefix = common_prefix(&candidates);
    match input.rsplit_once(' ') {
        None => prefix,
        Some((head, _)) => format!("{} {}", head, prefix),
    }
}

/// The start of the word being completed, as a byte offset into `input`
pub fn word_start(input: &str) -> usize {
    input.rfind(' ').map(|i| i + 1).unwrap_or(0)
}

fn file_suggestions(partial: &str, cwd: &Path) -> Vec<String> {
    let (dir_part, prefix) = match partial.rfind('/') {
        Some(i) => (&partial[..=i], &partial[i + 1..]),
        None => ("", partial),
    };

    let dir = cwd.join(dir_part);
    let Ok(entries) = fs::read_dir(&dir) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(prefix) {
                return None;
            }
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            Some(if is_dir { format!("{}/", name) } else { name })
        })
        .collect();
    names.sort();

    names
        .into_iter()
        .take(MAX_FILE_SUGGESTIONS)
        .map(|name| format!("{}{}", dir_part, name))
        .collect()
}

fn common_prefix(candidates: &[String]) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };
    let mut prefix: &str = first;
    for candidate in &candidates[1..] {
        while !candidate.starts_with(prefix) {
            let mut chars = prefix.chars();
            chars.next_back();
            prefix = chars.as_str();
        }
    }
    prefix.to_string()
}

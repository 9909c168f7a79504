use std::fs;
use std::io;
use std::path::Path;

use super::engine::CommandResult;

// Characters that need a real shell to interpret. A line containing any of them is never
// treated as a built-in, since built-ins split on whitespace and support no quoting.
const SHELL_META: &[char] = &[
    '|', '&', ';', '<', '>', '(', ')', '$', '`', '\\', '"', '\'', '*', '?', '[', ']', '{', '}',
    '~', '!', '#',
];

/// A command line the engine can run without spawning a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    Ls(Option<String>),
    Pwd,
    Cat(String),
    Echo(String),
    Mkdir(String),
    Touch(String),
    Rm(String),
    Cp(Vec<String>),
    Mv(Vec<String>),
}

impl Builtin {
    /// Match a command line against the built-in forms, in precedence order.
    ///
    /// Option flags, shell metacharacters or an unsupported argument count send the line to
    /// the native shell instead. `cp` and `mv` are the exception: with any arguments they are
    /// built-ins, and a wrong argument count is reported as a usage error.
    pub fn parse(command_line: &str) -> Option<Builtin> {
        let line = command_line.trim();
        if line.contains(SHELL_META) {
            return None;
        }

        let mut words = line.split_whitespace();
        let command = words.next()?;
        let args: Vec<&str> = words.collect();
        if args.iter().any(|arg| arg.starts_with('-')) {
            return None;
        }

        let builtin = match (command, args.as_slice()) {
            ("ls", []) => Builtin::Ls(None),
            ("ls", [dir]) => Builtin::Ls(Some(dir.to_string())),
            ("pwd", []) => Builtin::Pwd,
            ("cat", [file]) => Builtin::Cat(file.to_string()),
            ("echo", [_, ..]) => Builtin::Echo(line["echo".len()..].trim().to_string()),
            ("mkdir", [dir]) => Builtin::Mkdir(dir.to_string()),
            ("touch", [file]) => Builtin::Touch(file.to_string()),
            ("rm", [path]) => Builtin::Rm(path.to_string()),
            ("cp", [_, ..]) => Builtin::Cp(owned(&args)),
            ("mv", [_, ..]) => Builtin::Mv(owned(&args)),
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Ls(_) => "ls",
            Builtin::Pwd => "pwd",
            Builtin::Cat(_) => "cat",
            Builtin::Echo(_) => "echo",
            Builtin::Mkdir(_) => "mkdir",
            Builtin::Touch(_) => "touch",
            Builtin::Rm(_) => "rm",
            Builtin::Cp(_) => "cp",
            Builtin::Mv(_) => "mv",
        }
    }

    /// Run against the file system, resolving every path relative to `cwd`
    pub fn run(&self, cwd: &Path) -> CommandResult {
        match self {
            Builtin::Ls(dir) => ls(cwd, dir.as_deref()),
            Builtin::Pwd => CommandResult::ok(cwd.display().to_string()),
            Builtin::Cat(file) => cat(cwd, file),
            Builtin::Echo(text) => CommandResult::ok(text.clone()),
            Builtin::Mkdir(dir) => mkdir(cwd, dir),
            Builtin::Touch(file) => touch(cwd, file),
            Builtin::Rm(path) => rm(cwd, path),
            Builtin::Cp(args) => cp(cwd, args),
            Builtin::Mv(args) => mv(cwd, args),
        }
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|arg| arg.to_string()).collect()
}

fn ls(cwd: &Path, dir: Option<&str>) -> CommandResult {
    let target = match dir {
        Some(dir) => cwd.join(dir),
        None => cwd.to_path_buf(),
    };
    if !target.is_dir() {
        return CommandResult::failure(format!(
            "Directory not found: {}",
            dir.unwrap_or(".")
        ));
    }

    let entries = match fs::read_dir(&target) {
        Ok(entries) => entries,
        Err(e) => return CommandResult::failure(format!("Failed to read directory: {}", e)),
    };

    let mut lines: Vec<(String, String)> = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let line = match entry.metadata() {
            Ok(meta) if meta.is_dir() => format!("d {} (0 bytes)", name),
            Ok(meta) => format!("- {} ({} bytes)", name, meta.len()),
            Err(_) => format!("- {} (0 bytes)", name),
        };
        lines.push((name, line));
    }
    lines.sort_by(|a, b| a.0.cmp(&b.0));

    let output: Vec<String> = lines.into_iter().map(|(_, line)| line).collect();
    CommandResult::ok(output.join("\n"))
}

fn cat(cwd: &Path, file: &str) -> CommandResult {
    let path = cwd.join(file);
    if !path.exists() {
        return CommandResult::failure(format!("File not found: {}", file));
    }
    if !path.is_file() {
        return CommandResult::failure(format!("{} is not a file", file));
    }
    match fs::read(&path) {
        Ok(bytes) => CommandResult::ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => CommandResult::failure(format!("Failed to read file: {}", e)),
    }
}

fn mkdir(cwd: &Path, dir: &str) -> CommandResult {
    let path = cwd.join(dir);
    if path.exists() {
        return CommandResult::failure(format!(
            "Failed to create directory: {} already exists",
            dir
        ));
    }
    match fs::create_dir_all(&path) {
        Ok(()) => CommandResult::ok(format!("Directory created: {}", dir)),
        Err(e) => CommandResult::failure(format!("Failed to create directory: {}: {}", dir, e)),
    }
}

fn touch(cwd: &Path, file: &str) -> CommandResult {
    let result = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(cwd.join(file));
    match result {
        Ok(_) => CommandResult::ok(format!("File created: {}", file)),
        Err(e) => CommandResult::failure(format!("Failed to create file: {}", e)),
    }
}

fn rm(cwd: &Path, target: &str) -> CommandResult {
    let path = cwd.join(target);
    // symlink_metadata so a dangling link can still be removed
    let Ok(meta) = fs::symlink_metadata(&path) else {
        return CommandResult::failure(format!("File not found: {}", target));
    };
    let result = if meta.is_dir() {
        fs::remove_dir_all(&path)
    } else {
        fs::remove_file(&path)
    };
    match result {
        Ok(()) => CommandResult::ok(format!("Removed: {}", target)),
        Err(e) => CommandResult::failure(format!("Failed to remove: {}: {}", target, e)),
    }
}

fn cp(cwd: &Path, args: &[String]) -> CommandResult {
    let [source, dest] = args else {
        return CommandResult::failure("Usage: cp <source> <destination>");
    };
    let source_path = cwd.join(source);
    if !source_path.exists() {
        return CommandResult::failure(format!("Source not found: {}", source));
    }
    let dest_path = into_directory(&source_path, &cwd.join(dest));
    match copy_recursively(&source_path, &dest_path) {
        Ok(()) => CommandResult::ok(format!("Copied: {} -> {}", source, dest)),
        Err(e) => CommandResult::failure(format!("Copy failed: {}", e)),
    }
}

fn mv(cwd: &Path, args: &[String]) -> CommandResult {
    let [source, dest] = args else {
        return CommandResult::failure("Usage: mv <source> <destination>");
    };
    let source_path = cwd.join(source);
    if !source_path.exists() {
        return CommandResult::failure(format!("Source not found: {}", source));
    }
    let dest_path = into_directory(&source_path, &cwd.join(dest));
    match fs::rename(&source_path, &dest_path) {
        Ok(()) => CommandResult::ok(format!("Moved: {} -> {}", source, dest)),
        Err(e) => CommandResult::failure(format!("Move failed: {}", e)),
    }
}

// `cp a dir/` and `mv a dir/` land inside an existing directory, like the coreutils versions.
fn into_directory(source: &Path, dest: &Path) -> std::path::PathBuf {
    match source.file_name() {
        Some(name) if dest.is_dir() => dest.join(name),
        _ => dest.to_path_buf(),
    }
}

fn copy_recursively(source: &Path, dest: &Path) -> io::Result<()> {
    if source.is_dir() {
        fs::create_dir_all(dest)?;
        for entry in fs::read_dir(source)? {
            let entry = entry?;
            copy_recursively(&entry.path(), &dest.join(entry.file_name()))?;
        }
        Ok(())
    } else {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, dest).map(|_| ())
    }
}

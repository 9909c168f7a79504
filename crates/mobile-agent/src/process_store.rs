use kill_tree::{blocking::kill_tree_with_config, Config};
use lazy_static::lazy_static;
use std::sync::Mutex;

// Pids of native subprocesses spawned by any command engine in this process.
lazy_static! {
    static ref PROCESS_STORE: Mutex<Vec<u32>> = Mutex::new(Vec::new());
}

pub fn store_process(pid: u32) {
    if let Ok(mut store) = PROCESS_STORE.lock() {
        store.push(pid);
    }
}

// Forgets a pid without signalling it.
pub fn remove_process(pid: u32) -> bool {
    let Ok(mut store) = PROCESS_STORE.lock() else {
        return false;
    };
    if let Some(index) = store.iter().position(|&x| x == pid) {
        store.remove(index);
        true
    } else {
        false
    }
}

fn tracked_processes() -> Vec<u32> {
    PROCESS_STORE
        .lock()
        .map(|store| store.clone())
        .unwrap_or_default()
}

/// SIGKILL a process and all of its descendants, returning every pid that is now gone
pub fn kill_process_tree(pid: u32) -> Vec<u32> {
    let config = Config {
        signal: "SIGKILL".to_string(),
        ..Default::default()
    };
    match kill_tree_with_config(pid, &config) {
        Ok(outputs) => outputs
            .into_iter()
            .map(|output| match output {
                kill_tree::Output::Killed { process_id, .. } => process_id,
                kill_tree::Output::MaybeAlreadyTerminated { process_id, .. } => process_id,
            })
            .collect(),
        Err(e) => {
            tracing::warn!(pid, error = %e, "failed to kill process tree");
            Vec::new()
        }
    }
}

/// Kill all stored processes
pub fn kill_processes() -> usize {
    let mut killed = 0;
    for pid in tracked_processes() {
        if !kill_process_tree(pid).is_empty() {
            killed += 1;
        }
        remove_process(pid);
    }
    killed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_store_and_remove() {
        store_process(999_999);
        assert!(tracked_processes().contains(&999_999));
        assert!(remove_process(999_999));
        assert!(!remove_process(999_999));
    }

    #[test]
    #[serial]
    fn test_kill_process_tree() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();

        let killed = kill_process_tree(child.id());
        assert!(killed.contains(&child.id()));

        let status = child.wait().unwrap();
        assert!(!status.success());
    }
}

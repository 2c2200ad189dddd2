//! Architecture enforcement tests.
//!
//! Every borg invocation must go through `Executor::run`, which holds the
//! repository lock while the process runs. These tests catch code that
//! spawns processes or composes borg commands outside the engine.
//!
//! # Test Categories
//!
//! 1. **Process Spawning** - Only `engine/runner.rs` may use `std::process`
//! 2. **Command Handlers** - Handlers go through `RepoOps`, never the executor
//! 3. **Core Purity** - `core` never reaches into `engine` or `cli`

use std::fs;
use std::path::{Path, PathBuf};

/// Files allowed to spawn child processes.
const SPAWN_ALLOWED: &[&str] = &["src/engine/runner.rs"];

fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).unwrap_or_else(|_| panic!("Failed to read {}", dir.display())) {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            files.extend(rust_files(&path));
        } else if path.extension().map(|e| e == "rs").unwrap_or(false) {
            files.push(path);
        }
    }
    files
}

/// Source with `#[cfg(test)]` modules cut off.
fn non_test_source(path: &Path) -> String {
    let content =
        fs::read_to_string(path).unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    match content.find("#[cfg(test)]") {
        Some(idx) => content[..idx].to_string(),
        None => content,
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[test]
fn only_runner_spawns_processes() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src")) {
        let name = display(&path);
        if SPAWN_ALLOWED.contains(&name.as_str()) {
            continue;
        }

        let content = non_test_source(&path);
        if content.contains("std::process::Command")
            || content.contains("process::{Command")
            || content.contains(".spawn()")
        {
            violations.push(format!("{}: spawns a process outside the runner", name));
        }
    }

    assert!(
        violations.is_empty(),
        "Process spawning outside engine/runner.rs:\n{}",
        violations.join("\n")
    );
}

#[test]
fn command_handlers_use_repo_ops() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src/cli/commands")) {
        let name = display(&path);
        let content = non_test_source(&path);

        for forbidden in ["Executor", "BorgOperation", "CommandComposer", "clear_dir"] {
            if content.contains(forbidden) {
                violations.push(format!("{}: uses {} directly", name, forbidden));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Command handlers must go through RepoOps:\n{}",
        violations.join("\n")
    );
}

#[test]
fn core_does_not_depend_on_outer_layers() {
    let mut violations = Vec::new();

    for path in rust_files(Path::new("src/core")) {
        let name = display(&path);
        let content = non_test_source(&path);

        for forbidden in ["crate::engine", "crate::cli"] {
            if content.contains(forbidden) {
                violations.push(format!("{}: imports {}", name, forbidden));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "core must not depend on engine or cli:\n{}",
        violations.join("\n")
    );
}

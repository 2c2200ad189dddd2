//! Integration tests for repository operations.
//!
//! These tests drive [`RepoOps`] through a scripted [`ProcessRunner`] that
//! records every invocation and how many ran at once per repository, so
//! locking, argument composition and exit classification are checked
//! without a borg binary.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use volborg::core::config::{CreateOptions, PruneOptions};
use volborg::core::ops::LockRegistry;
use volborg::core::repository::RepoDescriptor;
use volborg::core::types::RepoLocation;
use volborg::engine::{
    CommandComposer, ExecuteError, Executor, Invocation, OpsError, PrepareOutcome, ProcessOutput,
    ProcessRunner, RepoOps,
};

// =============================================================================
// Test Fixtures
// =============================================================================

const MISSING_REPO: &str = "Repository does not exist";

/// Scripted reply for one borg subcommand.
#[derive(Clone)]
enum Reply {
    Exit(i32, &'static str, &'static str),
    Killed(&'static str),
    SpawnError(io::ErrorKind),
}

/// Runner that answers by borg subcommand and records what it saw.
#[derive(Default)]
struct ScriptedRunner {
    replies: Mutex<HashMap<String, Reply>>,
    calls: Mutex<Vec<Invocation>>,
    active: Mutex<HashMap<String, usize>>,
    max_active: Mutex<HashMap<String, usize>>,
    max_total: Mutex<usize>,
    delay: Duration,
}

impl ScriptedRunner {
    fn new() -> Self {
        Self::default()
    }

    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn reply(self, subcommand: &str, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(subcommand.to_string(), reply);
        self
    }

    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    fn subcommands(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|inv| inv.args.first().cloned().unwrap_or_default())
            .collect()
    }

    fn max_active_for(&self, location: &str) -> usize {
        self.max_active
            .lock()
            .unwrap()
            .get(location)
            .copied()
            .unwrap_or(0)
    }

    fn max_total(&self) -> usize {
        *self.max_total.lock().unwrap()
    }

    fn enter(&self, location: &str) {
        let mut active = self.active.lock().unwrap();
        let count = active.entry(location.to_string()).or_insert(0);
        *count += 1;
        let current = *count;
        let total: usize = active.values().sum();
        drop(active);

        let mut max = self.max_active.lock().unwrap();
        let slot = max.entry(location.to_string()).or_insert(0);
        *slot = (*slot).max(current);
        drop(max);

        let mut max_total = self.max_total.lock().unwrap();
        *max_total = (*max_total).max(total);
    }

    fn leave(&self, location: &str) {
        let mut active = self.active.lock().unwrap();
        if let Some(count) = active.get_mut(location) {
            *count -= 1;
        }
    }
}

impl ProcessRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput> {
        self.calls.lock().unwrap().push(invocation.clone());

        let location = invocation.env.get("BORG_REPO").cloned().unwrap_or_default();
        self.enter(&location);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.leave(&location);

        let subcommand = invocation.args.first().cloned().unwrap_or_default();
        let reply = self.replies.lock().unwrap().get(&subcommand).cloned();
        match reply {
            None => Ok(ProcessOutput::exited(0, "", "")),
            Some(Reply::Exit(code, stdout, stderr)) => {
                Ok(ProcessOutput::exited(code, stdout, stderr))
            }
            Some(Reply::Killed(stderr)) => Ok(ProcessOutput {
                code: None,
                stdout: String::new(),
                stderr: stderr.to_string(),
                timed_out: true,
            }),
            Some(Reply::SpawnError(kind)) => Err(io::Error::new(kind, "borg: not found")),
        }
    }
}

fn repo(location: &str) -> RepoDescriptor {
    RepoDescriptor::new(RepoLocation::new(location).unwrap())
}

fn ops(runner: ScriptedRunner) -> RepoOps<ScriptedRunner> {
    ops_with_locks(runner, Arc::new(LockRegistry::new()))
}

fn ops_with_locks(runner: ScriptedRunner, locks: Arc<LockRegistry>) -> RepoOps<ScriptedRunner> {
    RepoOps::new(Executor::new(runner, CommandComposer::default(), locks))
}

fn runner_of(ops: &RepoOps<ScriptedRunner>) -> &ScriptedRunner {
    ops.executor().runner()
}

// =============================================================================
// Locking
// =============================================================================

#[test]
fn same_location_is_serialized() {
    let ops = Arc::new(ops(ScriptedRunner::with_delay(Duration::from_millis(30))));
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let ops = Arc::clone(&ops);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ops.delete(&repo("/srv/borg/web"), &format!("archive-{}", i))
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let runner = runner_of(&ops);
    assert_eq!(runner.calls().len(), 4);
    assert_eq!(runner.max_active_for("/srv/borg/web"), 1);
}

#[test]
fn distinct_locations_run_concurrently() {
    let ops = Arc::new(ops(ScriptedRunner::with_delay(Duration::from_millis(200))));
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["/srv/borg/a", "/srv/borg/b"]
        .into_iter()
        .map(|location| {
            let ops = Arc::clone(&ops);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                ops.list(&repo(location)).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(runner_of(&ops).max_total(), 2);
}

#[test]
fn guard_released_after_fatal_exit() {
    let locks = Arc::new(LockRegistry::new());
    let runner = ScriptedRunner::new().reply("list", Reply::Exit(2, "", MISSING_REPO));
    let ops = ops_with_locks(runner, Arc::clone(&locks));

    assert!(ops.list(&repo("/srv/borg/web")).is_err());
    assert!(!locks.is_locked("/srv/borg/web"));
}

#[test]
fn guard_released_after_timeout() {
    let locks = Arc::new(LockRegistry::new());
    let runner = ScriptedRunner::new().reply("list", Reply::Killed("Remote: connecting..."));
    let ops = ops_with_locks(runner, Arc::clone(&locks));

    match ops.list(&repo("/srv/borg/web")).unwrap_err() {
        OpsError::Execute(ExecuteError::TimedOut {
            operation, stderr, ..
        }) => {
            assert_eq!(operation, "list");
            assert_eq!(stderr, "Remote: connecting...");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!locks.is_locked("/srv/borg/web"));
    assert!(locks.try_acquire("/srv/borg/web").is_some());
}

#[test]
fn guard_released_after_spawn_error() {
    let locks = Arc::new(LockRegistry::new());
    let runner = ScriptedRunner::new().reply("list", Reply::SpawnError(io::ErrorKind::NotFound));
    let ops = ops_with_locks(runner, Arc::clone(&locks));

    assert!(ops.list(&repo("/srv/borg/web")).is_err());
    assert!(!locks.is_locked("/srv/borg/web"));
}

// =============================================================================
// Archive names
// =============================================================================

#[test]
fn create_and_restore_share_archive_token() {
    let dest = TempDir::new().unwrap();
    let source = TempDir::new().unwrap();
    let ops = ops(ScriptedRunner::new());
    let target = repo("/srv/borg/web");

    ops.create(&target, "myarchive", source.path()).unwrap();
    ops.restore(&target, "myarchive", dest.path()).unwrap();

    let calls = runner_of(&ops).calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].args.contains(&"::myarchive".to_string()));
    assert!(calls[1].args.contains(&"::myarchive".to_string()));
}

#[test]
fn path_prefix_is_stripped_from_archive_name() {
    let ops = ops(ScriptedRunner::new());
    ops.delete(&repo("/srv/borg/web"), "foo/bar").unwrap();

    let calls = runner_of(&ops).calls();
    assert_eq!(calls[0].args, vec!["delete", "::bar", "--force"]);
}

#[test]
fn create_runs_in_source_folder() {
    let source = TempDir::new().unwrap();
    let ops = ops(ScriptedRunner::new()).with_create_options(CreateOptions {
        exclude: vec!["*.tmp".to_string()],
        exclude_caches: true,
        extra_args: vec![],
    });

    ops.create(&repo("/srv/borg/web"), "nightly", source.path())
        .unwrap();

    let call = &runner_of(&ops).calls()[0];
    assert_eq!(call.cwd.as_deref(), Some(source.path()));
    assert_eq!(
        call.args,
        vec![
            "create",
            "--stats",
            "--exclude",
            "*.tmp",
            "--exclude-caches",
            "::nightly",
            "."
        ]
    );
}

#[test]
fn environment_names_repository() {
    let ops = ops(ScriptedRunner::new());
    let target = repo("ssh://backup@host/srv/borg/web").with_key("/etc/volborg/id_ed25519");
    ops.list(&target).unwrap();

    let env = &runner_of(&ops).calls()[0].env;
    assert_eq!(env["BORG_REPO"], "ssh://backup@host/srv/borg/web");
    assert!(env["BORG_RSH"].starts_with("ssh -o StrictHostKeyChecking=no"));
    assert!(env["BORG_RSH"].contains("-i"));
    assert!(!env.contains_key("BORG_PASSPHRASE"));
}

// =============================================================================
// Exit classification
// =============================================================================

#[test]
fn warning_exit_is_success_with_output() {
    let source = TempDir::new().unwrap();
    let runner = ScriptedRunner::new().reply(
        "create",
        Reply::Exit(1, "", "warning: file vanished: data/tmp.sock"),
    );
    let ops = ops(runner);

    let output = ops
        .create(&repo("/srv/borg/web"), "nightly", source.path())
        .unwrap();
    assert!(output.is_warning());
    assert!(output.stderr.contains("warning: file vanished"));
}

#[test]
fn other_exit_is_fatal_with_code_and_stderr() {
    let runner = ScriptedRunner::new().reply("list", Reply::Exit(2, "", MISSING_REPO));
    let ops = ops(runner);

    let err = ops.list(&repo("/srv/borg/web")).unwrap_err();
    match err {
        OpsError::Execute(ExecuteError::FatalExit { code, stderr, .. }) => {
            assert_eq!(code, Some(2));
            assert_eq!(stderr, MISSING_REPO);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn spawn_error_passes_through() {
    let runner = ScriptedRunner::new().reply("list", Reply::SpawnError(io::ErrorKind::NotFound));
    let ops = ops(runner);

    match ops.list(&repo("/srv/borg/web")).unwrap_err() {
        OpsError::Execute(ExecuteError::Spawn(err)) => {
            assert_eq!(err.kind(), io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

// =============================================================================
// Prepare
// =============================================================================

#[test]
fn prepare_existing_repository_does_not_init() {
    let ops = ops(ScriptedRunner::new());
    let outcome = ops.prepare(&repo("/srv/borg/web")).unwrap();

    assert!(matches!(outcome, PrepareOutcome::Ready));
    assert_eq!(runner_of(&ops).subcommands(), vec!["list"]);
}

#[test]
fn prepare_inits_exactly_once_after_list_failure() {
    let runner = ScriptedRunner::new().reply("list", Reply::Exit(2, "", MISSING_REPO));
    let ops = ops(runner);

    let outcome = ops.prepare(&repo("/srv/borg/web")).unwrap();
    assert!(matches!(outcome, PrepareOutcome::Initialized(_)));

    let calls = runner_of(&ops).calls();
    assert_eq!(runner_of(&ops).subcommands(), vec!["list", "init"]);
    assert_eq!(calls[1].args, vec!["init", "-e", "none"]);
}

#[test]
fn prepare_returns_init_error() {
    let runner = ScriptedRunner::new()
        .reply("list", Reply::Exit(2, "", "Connection closed by remote host"))
        .reply("init", Reply::Exit(2, "", "Remote: ssh: connect to host failed"));
    let ops = ops(runner);

    let err = ops.prepare(&repo("ssh://backup@host/srv/borg/web")).unwrap_err();
    match err {
        OpsError::Execute(ExecuteError::FatalExit {
            operation, stderr, ..
        }) => {
            assert_eq!(operation, "init");
            assert!(stderr.contains("connect to host failed"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(runner_of(&ops).subcommands(), vec!["list", "init"]);
}

// =============================================================================
// Restore
// =============================================================================

#[test]
fn restore_refuses_root_and_empty_without_running_borg() {
    let ops = ops(ScriptedRunner::new());
    let target = repo("/srv/borg/web");

    for dest in ["", "/"] {
        let err = ops.restore(&target, "nightly", Path::new(dest)).unwrap_err();
        assert!(err.is_unsafe_delete_path(), "dest {:?}: {:?}", dest, err);
    }
    assert!(runner_of(&ops).calls().is_empty());
}

#[test]
fn restore_clears_destination_then_extracts_into_it() {
    let dest = TempDir::new().unwrap();
    fs::write(dest.path().join("stale.txt"), "old").unwrap();
    fs::create_dir(dest.path().join("nested")).unwrap();
    fs::write(dest.path().join("nested/inner.txt"), "old").unwrap();

    let ops = ops(ScriptedRunner::new());
    ops.restore(&repo("/srv/borg/web"), "nightly", dest.path())
        .unwrap();

    assert!(dest.path().exists());
    assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);

    let call = &runner_of(&ops).calls()[0];
    assert_eq!(call.args, vec!["extract", "::nightly"]);
    assert_eq!(call.cwd.as_deref(), Some(dest.path()));
}

#[test]
fn restore_failure_surfaces_extract_error() {
    let dest = TempDir::new().unwrap();
    let runner = ScriptedRunner::new()
        .reply("extract", Reply::Exit(2, "", "Archive nightly does not exist"));
    let ops = ops(runner);

    let err = ops
        .restore(&repo("/srv/borg/web"), "nightly", dest.path())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        ExecuteError::FatalExit {
            operation: "extract",
            code: Some(2),
            stdout: String::new(),
            stderr: "Archive nightly does not exist".to_string(),
        }
        .to_string()
    );
}

// =============================================================================
// Listing and pruning
// =============================================================================

#[test]
fn list_archives_takes_first_column() {
    let runner = ScriptedRunner::new().reply(
        "list",
        Reply::Exit(
            0,
            "web-2024-01-01T00:00:00   Mon, 2024-01-01 00:00:01 [abc]\n\
             web-2024-01-02T00:00:00   Tue, 2024-01-02 00:00:01 [def]\n",
            "",
        ),
    );
    let ops = ops(runner);

    let names = ops.list_archives(&repo("/srv/borg/web")).unwrap();
    assert_eq!(names, vec!["web-2024-01-01T00:00:00", "web-2024-01-02T00:00:00"]);
}

#[test]
fn prune_without_rules_does_not_run_borg() {
    let ops = ops(ScriptedRunner::new());
    let err = ops
        .prune(&repo("/srv/borg/web"), &PruneOptions::default())
        .unwrap_err();

    assert!(matches!(err, OpsError::NoPruneRules));
    assert!(runner_of(&ops).calls().is_empty());
}

#[test]
fn prune_passes_keep_flags() {
    let ops = ops(ScriptedRunner::new());
    let options = PruneOptions {
        keep_daily: Some(7),
        keep_weekly: Some(4),
        ..PruneOptions::default()
    };
    ops.prune(&repo("/srv/borg/web"), &options).unwrap();

    let args = &runner_of(&ops).calls()[0].args;
    assert_eq!(&args[..3], &["prune", "--list", "--stats"]);
    assert!(args.windows(2).any(|w| w == ["--keep-daily", "7"]));
    assert!(args.windows(2).any(|w| w == ["--keep-weekly", "4"]));
}

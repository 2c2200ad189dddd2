//! engine::runner
//!
//! Process spawning behind a trait.
//!
//! # Architecture
//!
//! The executor never calls `std::process` directly. It hands an
//! [`Invocation`] to a [`ProcessRunner`], which spawns the program
//! synchronously, waits for it, and returns both captured streams and the
//! exit status. [`SystemRunner`] is the real implementation; tests swap in
//! fakes that record calls and return canned output.
//!
//! # Contract
//!
//! - `Err(io::Error)` means the process could not be started (or waited on)
//! - `Ok(ProcessOutput)` means it ran; the exit status is not interpreted here
//! - stdin is always null, so the child can never block on a prompt
//!
//! # Timeouts
//!
//! With a timeout, [`SystemRunner`] polls the child and kills it once the
//! deadline passes. Output captured up to that point is returned with
//! `timed_out` set. Processes the child started are not waited for, even if
//! they keep its output pipes open.

use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::command::Invocation;

/// How often a child with a deadline is polled.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long pipe readers get to finish after a deadline kill.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// Captured result of one finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, or `None` if the process was terminated by a signal.
    pub code: Option<i32>,
    /// Captured standard output, lossily decoded.
    pub stdout: String,
    /// Captured standard error, lossily decoded.
    pub stderr: String,
    /// The process was killed because it ran past its deadline.
    pub timed_out: bool,
}

impl ProcessOutput {
    /// Output of a process that exited normally with `code`.
    pub fn exited(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
            timed_out: false,
        }
    }

    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0) && !self.timed_out
    }
}

/// Synchronous spawn-and-capture.
pub trait ProcessRunner: Send + Sync {
    /// Run `invocation` to completion.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the process cannot be spawned.
    fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput>;
}

/// Runs invocations as real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    timeout: Option<Duration>,
}

impl SystemRunner {
    /// A runner that waits for children indefinitely.
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// A runner that kills children after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> io::Result<ProcessOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.envs(&invocation.env);
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        debug!(command = %invocation.command_line(), "spawning");

        let mut child = cmd.spawn()?;

        // Drain both pipes on their own threads so a chatty child cannot
        // fill one pipe while we wait on the other.
        let stdout = Capture::start(child.stdout.take());
        let stderr = Capture::start(child.stderr.take());

        let mut timed_out = false;
        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if Instant::now() >= deadline {
                        warn!(
                            command = %invocation.command_line(),
                            timeout_secs = limit.as_secs(),
                            "deadline passed, killing process"
                        );
                        // The child may have exited between try_wait and kill.
                        let _ = child.kill();
                        timed_out = true;
                        break child.wait()?;
                    }
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    thread::sleep(POLL_INTERVAL.min(remaining));
                }
            }
        };

        // After a kill, descendants of the child (ssh, a password helper)
        // may still hold the pipes open. Take what has arrived instead of
        // waiting for end of file.
        let (stdout, stderr) = if timed_out {
            let grace = Instant::now() + DRAIN_GRACE;
            (stdout.snapshot(grace), stderr.snapshot(grace))
        } else {
            (stdout.finish(), stderr.finish())
        };

        Ok(ProcessOutput {
            code: status.code(),
            stdout,
            stderr,
            timed_out,
        })
    }
}

/// One child pipe read to end of file on a background thread.
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Capture {
    fn start<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let handle = pipe.map(|mut pipe| {
            let buf = Arc::clone(&buf);
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => buf.lock().extend_from_slice(&chunk[..n]),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
            })
        });
        Self { buf, handle }
    }

    /// Wait for end of file, then return everything read.
    fn finish(self) -> String {
        let Capture { buf, handle } = self;
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        lossy(&buf)
    }

    /// Return what has been read, waiting for end of file no later than
    /// `grace`. A reader still blocked after that is left detached.
    fn snapshot(self, grace: Instant) -> String {
        if let Some(handle) = &self.handle {
            while !handle.is_finished() && Instant::now() < grace {
                thread::sleep(Duration::from_millis(10));
            }
        }
        lossy(&self.buf)
    }
}

fn lossy(buf: &Mutex<Vec<u8>>) -> String {
    String::from_utf8_lossy(&buf.lock()).into_owned()
}

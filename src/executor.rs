//! Low-level child process execution
//!
//! Spawns the test program in its own process group, drains its output on
//! reader threads, and enforces the deadline with a blocking bounded wait.
//! On expiry the whole tree is reclaimed: SIGTERM to the group, a grace
//! interval, then SIGKILL to the group and to any descendant that left it.

use chrono::Utc;
use nix::sys::signal::Signal;
use std::io::{self, Read};
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::command::CommandSpec;
use crate::config::HarnessConfig;
use crate::process;
use crate::result::TestResult;

/// Default interval between SIGTERM and SIGKILL
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// How long to wait for reader threads once the child is gone
const OUTPUT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(2);

/// Maximum captured size per stream (10MB)
const MAX_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

const TRUNCATION_MARKER: &[u8] = b"\n[output truncated at 10MB]";

/// Failures of the process plumbing itself.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The child could not be started at all.
    #[error("failed to launch {command}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },
    /// The child started but waiting on it failed.
    #[error("failed to wait for {command}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl ExecError {
    pub fn is_launch(&self) -> bool {
        matches!(self, ExecError::Launch { .. })
    }
}

/// Something that can run a [`CommandSpec`] to completion.
///
/// Implementations fill in the raw fields of a [`TestResult`] (return code,
/// output, timeout flag, PIDs, timing) and leave `status` as `NotRun`.
pub trait Execute: Send + Sync {
    fn execute(&self, command: &CommandSpec) -> Result<TestResult, ExecError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    grace_period: Duration,
    default_timeout: Option<Duration>,
    suppress_timeout: bool,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            default_timeout: None,
            suppress_timeout: false,
        }
    }
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            grace_period: config.grace_period(),
            default_timeout: config.default_timeout(),
            suppress_timeout: config.no_timeout,
        }
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Deadline applied to a command: its own timeout, else the default,
    /// and none at all when timeouts are suppressed.
    pub fn effective_timeout(&self, command: &CommandSpec) -> Option<Duration> {
        if self.suppress_timeout {
            None
        } else {
            command.timeout().or(self.default_timeout)
        }
    }

    /// Run `command` and capture its raw outcome.
    pub fn run(&self, command: &CommandSpec) -> Result<TestResult, ExecError> {
        let command_line = command.display();
        let timeout = self.effective_timeout(command);
        let started_at = Utc::now();
        let start = Instant::now();

        let mut child = spawn(command).map_err(|source| ExecError::Launch {
            command: command_line.clone(),
            source,
        })?;
        let pid = child.id();
        debug!(pid, command = %command_line, ?timeout, "spawned test process");

        // Readers must run while we wait, or a child filling the pipe
        // buffer would block forever on write().
        let stdout = StreamCapture::spawn(child.stdout.take());
        let stderr = StreamCapture::spawn(child.stderr.take());

        let waited = match timeout {
            Some(limit) => child.wait_timeout(limit),
            None => child.wait().map(Some),
        };
        let waited = match waited {
            Ok(status) => status,
            Err(source) => {
                warn!(pid, error = %source, "waiting on test process failed, killing its group");
                self.terminate_tree(&mut child, pid);
                return Err(ExecError::Wait {
                    command: command_line,
                    source,
                });
            }
        };

        let (returncode, timed_out) = match waited {
            Some(status) => {
                reap_stragglers(pid);
                (Some(returncode_of(status)), false)
            }
            None => {
                warn!(
                    pid,
                    command = %command_line,
                    ?timeout,
                    "test exceeded its timeout, killing process tree"
                );
                self.terminate_tree(&mut child, pid);
                (None, true)
            }
        };

        let (stdout, stdout_complete) = stdout.finish(OUTPUT_COLLECTION_TIMEOUT);
        let (stderr, stderr_complete) = stderr.finish(OUTPUT_COLLECTION_TIMEOUT);
        let output_incomplete = !(stdout_complete && stderr_complete);
        if output_incomplete {
            // A descendant outside the group (e.g. after setsid) still holds a pipe.
            warn!(
                pid,
                command = %command_line,
                "output pipes still open after the test ended, keeping what was read"
            );
        }

        Ok(TestResult {
            returncode,
            stdout,
            stderr,
            timed_out,
            output_incomplete,
            command: command_line,
            environment: command.display_env(),
            pids: vec![pid],
            attempts: 1,
            duration: start.elapsed(),
            started_at: Some(started_at),
            finished_at: Some(Utc::now()),
            ..TestResult::default()
        })
    }

    /// Reclaim the child and everything it spawned, then reap the child.
    ///
    /// Failures to signal are logged; the caller always gets control back.
    fn terminate_tree(&self, child: &mut Child, pgid: u32) {
        let escaped = process::descendants(pgid);

        if let Err(e) = process::signal_group(pgid, Signal::SIGTERM) {
            warn!(pgid, error = %e, "failed to send SIGTERM to process group");
        }

        match child.wait_timeout(self.grace_period) {
            Ok(Some(_)) => debug!(pgid, "test process exited after SIGTERM"),
            Ok(None) => debug!(pgid, grace = ?self.grace_period, "test process ignored SIGTERM"),
            Err(e) => warn!(pgid, error = %e, "failed to wait during grace period"),
        }

        if process::group_exists(pgid) {
            debug!(pgid, "sending SIGKILL to remaining process group members");
            if let Err(e) = process::signal_group(pgid, Signal::SIGKILL) {
                warn!(pgid, error = %e, "failed to send SIGKILL to process group");
            }
        }

        // Descendants that moved to another group or session are not reached
        // by killpg; kill them individually from the snapshot.
        for pid in escaped {
            if process::is_running(pid) {
                debug!(pid, "killing descendant outside the process group");
                if let Err(e) = process::signal_process(pid, Signal::SIGKILL) {
                    warn!(pid, error = %e, "failed to kill descendant");
                }
            }
        }

        if let Err(e) = child.wait() {
            warn!(pgid, error = %e, "failed to reap test process");
        }
    }
}

impl Execute for ProcessExecutor {
    fn execute(&self, command: &CommandSpec) -> Result<TestResult, ExecError> {
        self.run(command)
    }
}

/// Spawn `command` as the leader of a new process group with piped output.
fn spawn(command: &CommandSpec) -> io::Result<Child> {
    let mut cmd = Command::new(command.program());
    cmd.args(command.args())
        .envs(command.env())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0);

    if let Some(dir) = command.cwd() {
        cmd.current_dir(dir);
    }

    cmd.spawn()
}

/// Kill whatever the child left running in its group after a natural exit.
fn reap_stragglers(pgid: u32) {
    if process::group_exists(pgid) {
        debug!(pgid, "test exited with live children, killing its process group");
        if let Err(e) = process::signal_group(pgid, Signal::SIGKILL) {
            warn!(pgid, error = %e, "failed to kill leftover process group members");
        }
    }
}

/// Exit code, or the negated signal number for a child killed by a signal.
fn returncode_of(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => -signal,
        (None, None) => -1,
    }
}

/// Output of one pipe, accumulated by a background reader.
///
/// The buffer is shared so that whatever arrived before the child was killed
/// can be returned even if the reader never reaches EOF.
struct StreamCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<()>,
}

impl StreamCapture {
    fn spawn<R: Read + Send + 'static>(stream: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done) = mpsc::channel();

        match stream {
            Some(stream) => {
                let shared = Arc::clone(&buffer);
                thread::spawn(move || {
                    read_stream_into(stream, &shared);
                    let _ = done_tx.send(());
                });
            }
            None => {
                let _ = done_tx.send(());
            }
        }

        Self { buffer, done }
    }

    /// Buffered text, and whether the reader reached EOF within `window`.
    fn finish(self, window: Duration) -> (String, bool) {
        let completed = self.done.recv_timeout(window).is_ok();
        let bytes = match self.buffer.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        (String::from_utf8_lossy(&bytes).into_owned(), completed)
    }
}

/// Read a stream into `buffer` until EOF, keeping at most `MAX_OUTPUT_SIZE` bytes.
///
/// Past the limit the stream is still drained so the child never blocks on a
/// full pipe.
fn read_stream_into<R: Read>(mut stream: R, buffer: &Mutex<Vec<u8>>) {
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                if truncated {
                    continue;
                }
                let mut buf = match buffer.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                let remaining = MAX_OUTPUT_SIZE.saturating_sub(buf.len());
                let to_copy = n.min(remaining);
                buf.extend_from_slice(&chunk[..to_copy]);
                if to_copy < n {
                    buf.extend_from_slice(TRUNCATION_MARKER);
                    truncated = true;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

//! Result types for test execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::status::Status;

/// Normalized outcome of one test execution.
///
/// Created once per attempt. The interpreter and overlays refine it in
/// place; once the harness returns it, callers treat it as read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub status: Status,
    /// Exit code of the child. `None` if it never started or the harness
    /// killed it; a negative signal number if it died from a signal on its own.
    pub returncode: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Whether the deadline expired and the process tree was killed
    pub timed_out: bool,
    /// Output readers did not reach EOF in time; `stdout`/`stderr` hold
    /// only what was read before giving up
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub output_incomplete: bool,
    /// Error chain / backtrace of an internal failure, empty otherwise
    pub traceback: String,
    /// One-line description of an internal failure, empty otherwise
    pub exception: String,
    /// Effective command line, shell-quoted
    pub command: String,
    /// Environment overrides as `KEY=value` pairs
    pub environment: String,
    /// PIDs of every child started for this result, retries included
    pub pids: Vec<u32>,
    /// Number of times the command was executed
    pub attempts: u32,
    pub duration: Duration,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Text attached by the kernel-log collaborator
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kernel_log: String,
}

impl TestResult {
    /// Fresh result with status `NotRun`
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an internal failure was recorded
    pub fn has_diagnostics(&self) -> bool {
        !self.exception.is_empty() || !self.traceback.is_empty()
    }

    /// Record an internal failure and mark the result as failed.
    pub fn record_failure(&mut self, exception: impl Into<String>, traceback: impl Into<String>) {
        self.status = Status::Fail;
        self.exception = exception.into();
        self.traceback = traceback.into();
    }

    /// Get a summary of the result
    pub fn summary(&self) -> String {
        let duration_ms = self.duration.as_millis();
        format!(
            "{} - {} ({}ms, exit code: {:?})",
            self.status.as_str().to_uppercase(),
            self.command,
            duration_ms,
            self.returncode
        )
    }
}

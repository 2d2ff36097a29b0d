//! Capabilities the harness notifies around each run
//!
//! The harness does not own these; callers inject them. [`Noop`] implements
//! all three for callers that have nothing to plug in.

use tracing::info;

use crate::result::TestResult;
use crate::status::Status;

/// Receives progress for each test
pub trait LogSink: Send + Sync {
    /// A test is about to run
    fn start(&self, test: &str);

    /// A test finished with `status`
    fn log(&self, test: &str, status: Status);
}

/// Captures the kernel log range that brackets a run.
pub trait KernelLog: Send + Sync {
    /// Mark the start of the range for `test`
    fn begin(&self, test: &str);

    /// Close the range and attach whatever it captured to `result`.
    ///
    /// Implementations may also adjust the verdict, e.g. to flag a test that
    /// passed while the kernel complained.
    fn end(&self, test: &str, result: &mut TestResult);
}

/// Observes test execution for external telemetry
pub trait Monitor: Send + Sync {
    fn before_run(&self, test: &str);
    fn after_run(&self, test: &str, result: &TestResult);
}

/// Inert implementation of every collaborator
#[derive(Debug, Default, Clone, Copy)]
pub struct Noop;

impl LogSink for Noop {
    fn start(&self, _test: &str) {}
    fn log(&self, _test: &str, _status: Status) {}
}

impl KernelLog for Noop {
    fn begin(&self, _test: &str) {}
    fn end(&self, _test: &str, _result: &mut TestResult) {}
}

impl Monitor for Noop {
    fn before_run(&self, _test: &str) {}
    fn after_run(&self, _test: &str, _result: &TestResult) {}
}

/// Log sink that emits `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl LogSink for TracingLog {
    fn start(&self, test: &str) {
        info!(test, "running");
    }

    fn log(&self, test: &str, status: Status) {
        info!(test, %status, "finished");
    }
}

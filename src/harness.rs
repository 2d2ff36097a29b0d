//! Exception-safe execution of a single test
//!
//! [`Harness::execute`] is the one place where internal failures turn into
//! data: an error or a panic anywhere in the pipeline becomes a `Fail`
//! result carrying diagnostics, and never reaches the caller.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error};

use crate::collaborators::{KernelLog, LogSink, Monitor};
use crate::config::HarnessConfig;
use crate::executor::{Execute, ProcessExecutor};
use crate::result::TestResult;
use crate::test_case::TestCase;

/// Runs tests one at a time through an executor.
///
/// Holds no per-test state, so one harness can be shared across the worker
/// threads of an outer scheduler.
#[derive(Debug, Clone, Default)]
pub struct Harness<E = ProcessExecutor> {
    executor: E,
}

impl Harness<ProcessExecutor> {
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(ProcessExecutor::from_config(config))
    }
}

impl<E: Execute> Harness<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Run `test` and return its final result.
    ///
    /// Collaborators are notified in order: `log.start`,
    /// `kernel_log.begin`, `monitor.before_run`, the run itself,
    /// `kernel_log.end`, `monitor.after_run`, `log.log`.
    pub fn execute(
        &self,
        test: &TestCase,
        log: &dyn LogSink,
        kernel_log: &dyn KernelLog,
        monitor: &dyn Monitor,
    ) -> TestResult {
        let name = test.name();
        log.start(name);
        kernel_log.begin(name);
        monitor.before_run(name);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| test.run(&self.executor)));
        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => {
                let message = format!("{err:#}");
                error!(test = name, error = %message, "internal error while running test");
                internal_failure(test, message, format!("{err:?}"))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(test = name, panic = %message, "panic while running test");
                let traceback = format!("panicked: {message}\n{}", Backtrace::force_capture());
                internal_failure(test, format!("panic: {message}"), traceback)
            }
        };

        if !result.status.is_terminal() {
            result.record_failure(
                "test finished without a verdict",
                format!("status was still {} after the run", result.status),
            );
        }

        kernel_log.end(name, &mut result);
        monitor.after_run(name, &result);
        debug!(test = name, summary = %result.summary(), "test complete");
        log.log(name, result.status);
        result
    }
}

fn internal_failure(test: &TestCase, exception: String, traceback: String) -> TestResult {
    let mut result = TestResult {
        command: test.base_command().display(),
        environment: test.base_command().display_env(),
        ..TestResult::default()
    };
    result.record_failure(exception, traceback);
    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

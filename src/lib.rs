//! Execution core of a test harness.
//!
//! Runs one external test program as a child process with a wall-clock
//! timeout, reclaims its whole process tree, captures its output and turns
//! the raw outcome into a normalized [`TestResult`].

pub mod collaborators;
pub mod command;
pub mod commands;
pub mod config;
pub mod executor;
pub mod harness;
pub mod interpret;
pub mod overlay;
pub mod process;
pub mod result;
pub mod status;
pub mod test_case;

pub use collaborators::{KernelLog, LogSink, Monitor, Noop, TracingLog};
pub use command::{CommandSpec, SpecError};
pub use config::{HarnessConfig, DEFAULT_RETRY_MARKER, DEFAULT_WRAPPER_ARGV};
pub use executor::{ExecError, Execute, ProcessExecutor};
pub use harness::Harness;
pub use interpret::interpret;
pub use overlay::{Overlay, RetryOverlay, WrapperOverlay};
pub use result::TestResult;
pub use status::Status;
pub use test_case::TestCase;

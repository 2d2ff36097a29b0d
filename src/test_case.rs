//! A named test: base command plus its overlay chain

use anyhow::Result;
use std::error::Error;
use std::sync::Arc;
use tracing::debug;

use crate::command::CommandSpec;
use crate::executor::{ExecError, Execute};
use crate::interpret::interpret;
use crate::overlay::Overlay;
use crate::result::TestResult;

/// One runnable test.
///
/// Overlays are stored innermost first. The effective command is the base
/// command passed through every overlay from the inside out, and it is the
/// command every attempt runs, retries included.
#[derive(Clone)]
pub struct TestCase {
    name: String,
    command: CommandSpec,
    overlays: Vec<Arc<dyn Overlay>>,
}

impl std::fmt::Debug for TestCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("command", &self.command)
            .field(
                "overlays",
                &self.overlays.iter().map(|o| o.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl TestCase {
    pub fn new(name: impl Into<String>, command: CommandSpec) -> Self {
        Self {
            name: name.into(),
            command,
            overlays: Vec::new(),
        }
    }

    /// Wrap the test in `overlay`; it becomes the outermost layer.
    pub fn with_overlay(mut self, overlay: impl Overlay + 'static) -> Self {
        self.overlays.push(Arc::new(overlay));
        self
    }

    pub fn with_shared_overlay(mut self, overlay: Arc<dyn Overlay>) -> Self {
        self.overlays.push(overlay);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command as given, before any overlay
    pub fn base_command(&self) -> &CommandSpec {
        &self.command
    }

    /// The command that will actually be executed
    pub fn effective_command(&self) -> CommandSpec {
        self.overlays
            .iter()
            .fold(self.command.clone(), |command, overlay| {
                overlay.transform_command(command)
            })
    }

    /// Run the full pipeline once: build, execute, interpret, refine.
    ///
    /// Errors here are internal failures; a test that runs and fails is an
    /// `Ok` result with a failing status.
    pub fn run(&self, executor: &dyn Execute) -> Result<TestResult> {
        let command = self.effective_command();
        debug!(test = %self.name, command = %command.display(), "running test");
        self.run_layers(self.overlays.len(), &command, executor)
    }

    /// Run the innermost `depth` overlays around the base attempt.
    fn run_layers(
        &self,
        depth: usize,
        command: &CommandSpec,
        executor: &dyn Execute,
    ) -> Result<TestResult> {
        if depth == 0 {
            return attempt(command, executor);
        }

        let overlay = &self.overlays[depth - 1];
        let result = self.run_layers(depth - 1, command, executor)?;
        let mut rerun = || self.run_layers(depth - 1, command, executor);
        overlay.transform_result(result, &mut rerun)
    }
}

/// Execute `command` once and apply the base interpretation.
///
/// A launch failure is a normal outcome here: it becomes a result with no
/// return code carrying the error as diagnostics, which the interpreter
/// turns into a failure. Any other executor error is internal.
fn attempt(command: &CommandSpec, executor: &dyn Execute) -> Result<TestResult> {
    let mut result = match executor.execute(command) {
        Ok(result) => result,
        Err(err @ ExecError::Launch { .. }) => launch_failure(command, &err),
        Err(err) => return Err(err.into()),
    };
    interpret(&mut result);
    Ok(result)
}

fn launch_failure(command: &CommandSpec, err: &ExecError) -> TestResult {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }

    TestResult {
        command: command.display(),
        environment: command.display_env(),
        attempts: 1,
        exception: chain.join(": "),
        traceback: chain
            .iter()
            .enumerate()
            .map(|(i, line)| if i == 0 { line.clone() } else { format!("Caused by: {line}") })
            .collect::<Vec<_>>()
            .join("\n"),
        ..TestResult::default()
    }
}

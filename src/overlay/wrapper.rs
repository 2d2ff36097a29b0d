//! Diagnostic wrapper overlay (memory checker mode)

use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

use super::{Overlay, Rerun};
use crate::command::CommandSpec;
use crate::config::HarnessConfig;
use crate::result::TestResult;
use crate::status::Status;

/// Runs the test binary under the configured wrapper program.
///
/// In wrapper mode the verdict is about the binary's memory behavior, not
/// the test's own logic, so results are remapped:
/// - a launch failure (no return code, no timeout) keeps its `Fail`
/// - nonzero return code (the wrapper reports errors through it) → `Fail`
/// - otherwise any non-`Pass` verdict → `Skip`
/// - `Pass` stays `Pass`
///
/// With wrapper mode off both hooks leave their input untouched.
#[derive(Debug, Clone)]
pub struct WrapperOverlay {
    config: Arc<HarnessConfig>,
}

impl WrapperOverlay {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        Self { config }
    }

    pub fn enabled(&self) -> bool {
        self.config.wrapper.enabled
    }
}

impl Overlay for WrapperOverlay {
    fn name(&self) -> &str {
        "wrapper"
    }

    fn transform_command(&self, command: CommandSpec) -> CommandSpec {
        if !self.enabled() {
            return command;
        }
        command.with_prefix(self.config.wrapper.argv.iter())
    }

    fn transform_result(
        &self,
        mut result: TestResult,
        _rerun: &mut Rerun<'_>,
    ) -> Result<TestResult> {
        if !self.enabled() {
            return Ok(result);
        }

        let remapped = match result.returncode {
            // Never launched: there is no wrapper verdict to remap.
            None if !result.timed_out => result.status,
            Some(code) if code != 0 => Status::Fail,
            _ if result.status != Status::Pass => Status::Skip,
            _ => Status::Pass,
        };
        if remapped != result.status {
            debug!(from = %result.status, to = %remapped, "wrapper mode remapped status");
        }
        result.status = remapped;
        Ok(result)
    }
}

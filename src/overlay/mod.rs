//! Composable behaviors layered around a test
//!
//! An overlay can rewrite the command before it runs and/or refine the
//! interpreted result afterwards, optionally running the inner layers again.
//! Overlays are composed by nesting: the last one added to a
//! [`TestCase`](crate::TestCase) is the outermost.
//!
//! - [`WrapperOverlay`]: runs the test under a diagnostic wrapper program
//!   and remaps the verdict to what the wrapper checked
//! - [`RetryOverlay`]: reruns once when stdout shows a spurious,
//!   environment-induced failure

mod retry;
mod wrapper;

pub use retry::RetryOverlay;
pub use wrapper::WrapperOverlay;

use anyhow::Result;

use crate::command::CommandSpec;
use crate::result::TestResult;

/// Re-runs every layer below the current overlay and returns its result
pub type Rerun<'a> = dyn FnMut() -> Result<TestResult> + 'a;

/// A behavior that alters how a test is built or judged.
///
/// Both hooks default to the identity, so an overlay only implements the
/// side it cares about. Implementations hold no state between tests; anything
/// needed for a single invocation lives on the stack of `transform_result`.
pub trait Overlay: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Derive the command to run from the command produced by inner layers.
    fn transform_command(&self, command: CommandSpec) -> CommandSpec {
        command
    }

    /// Refine the result produced by inner layers.
    ///
    /// `rerun` performs a complete new attempt of the inner layers: a fresh
    /// process with its own deadline, interpreted and refined as before.
    fn transform_result(&self, result: TestResult, rerun: &mut Rerun<'_>) -> Result<TestResult> {
        let _ = rerun;
        Ok(result)
    }
}

//! Retry once on a known spurious artifact

use anyhow::{Context, Result};
use tracing::info;

use super::{Overlay, Rerun};
use crate::config::HarnessConfig;
use crate::result::TestResult;

/// Reruns the inner layers once when stdout contains `marker`.
///
/// The second attempt is adopted as-is, even if it shows the marker again:
/// this is at most one automatic retry, never a loop.
#[derive(Debug, Clone)]
pub struct RetryOverlay {
    marker: String,
}

impl RetryOverlay {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.retry.marker.clone())
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    fn detected(&self, result: &TestResult) -> bool {
        result.stdout.contains(&self.marker)
    }
}

impl Overlay for RetryOverlay {
    fn name(&self) -> &str {
        "retry-on-artifact"
    }

    fn transform_result(&self, first: TestResult, rerun: &mut Rerun<'_>) -> Result<TestResult> {
        if !self.detected(&first) {
            return Ok(first);
        }

        info!(
            marker = %self.marker(),
            command = %first.command,
            "spurious artifact detected, retrying once"
        );
        let mut second = rerun().context("Retry after spurious artifact failed")?;

        let mut pids = first.pids;
        pids.append(&mut second.pids);
        second.pids = pids;
        second.attempts += first.attempts;
        Ok(second)
    }
}

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Verdict of a single test execution.
///
/// Lifecycle:
/// - `NotRun` is the initial value of every result
/// - a finished execution ends in exactly one of `Pass`, `Warn`, `Fail`,
///   `Crash`, `Skip` or `Timeout`
/// - the harness never hands `NotRun` back to a caller
///
/// The declaration order is the severity order used for reporting, so the
/// derived `Ord` can be used to pick the "worst" of several results.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Execution has not produced a verdict yet.
    #[default]
    #[serde(alias = "not-run")]
    NotRun,

    /// The test decided it does not apply, or its verdict is irrelevant.
    Skip,

    /// The test ran and succeeded.
    Pass,

    /// The test succeeded but reported something worth a look.
    Warn,

    /// The test ran and failed, or the harness could not run it.
    Fail,

    /// The test exceeded its deadline and its process tree was killed.
    Timeout,

    /// The test process died from a signal.
    Crash,
}

impl Status {
    /// Every status, in severity order.
    pub const ALL: [Status; 7] = [
        Status::NotRun,
        Status::Skip,
        Status::Pass,
        Status::Warn,
        Status::Fail,
        Status::Timeout,
        Status::Crash,
    ];

    /// Verdicts that mean "something went wrong with the test itself".
    pub const PROBLEMS: [Status; 4] = [Status::Warn, Status::Fail, Status::Crash, Status::Timeout];

    /// Lowercase name used in logs, JSON and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::NotRun => "notrun",
            Status::Skip => "skip",
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "fail",
            Status::Timeout => "timeout",
            Status::Crash => "crash",
        }
    }

    /// Whether this status is a final verdict.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Status::NotRun)
    }

    /// Whether this status counts as a problem for reporting.
    pub fn is_problem(&self) -> bool {
        Status::PROBLEMS.contains(self)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "notrun" | "not-run" => Ok(Status::NotRun),
            "skip" => Ok(Status::Skip),
            "pass" => Ok(Status::Pass),
            "warn" => Ok(Status::Warn),
            "fail" => Ok(Status::Fail),
            "timeout" => Ok(Status::Timeout),
            "crash" => Ok(Status::Crash),
            _ => bail!("Unknown status: {s}"),
        }
    }
}

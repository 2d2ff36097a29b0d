//! `exectest run`: execute a single test from the command line

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::{Noop, TracingLog};
use crate::command::CommandSpec;
use crate::config::HarnessConfig;
use crate::harness::Harness;
use crate::overlay::{RetryOverlay, WrapperOverlay};
use crate::result::TestResult;
use crate::status::Status;
use crate::test_case::TestCase;

/// How the result is printed on stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Human,
}

/// Everything `exectest run` needs, already parsed
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub name: Option<String>,
    pub command: Vec<String>,
    pub timeout_secs: Option<u64>,
    pub config_path: Option<PathBuf>,
    pub wrapper: bool,
    pub retry_on_artifact: bool,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    pub format: OutputFormat,
}

/// Build the configuration: file (if any), then environment, then flags.
pub fn load_config(options: &RunOptions) -> Result<HarnessConfig> {
    let config = match &options.config_path {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    let mut config = config.apply_env_overrides();
    if options.wrapper {
        config.wrapper.enabled = true;
    }
    Ok(config)
}

/// Turn the options into a test with its overlays.
pub fn build_test(options: &RunOptions, config: Arc<HarnessConfig>) -> Result<TestCase> {
    let mut command = CommandSpec::new(options.command.iter()).context("Invalid test command")?;
    if let Some(secs) = options.timeout_secs {
        command = command.with_timeout(Duration::from_secs(secs));
    }
    for (key, value) in &options.env {
        command = command.with_env(key, value);
    }
    if let Some(dir) = &options.cwd {
        command = command.with_cwd(dir);
    }

    let name = options
        .name
        .clone()
        .unwrap_or_else(|| command.program().to_string());

    let mut test =
        TestCase::new(name, command).with_overlay(WrapperOverlay::new(Arc::clone(&config)));
    if options.retry_on_artifact {
        test = test.with_overlay(RetryOverlay::from_config(&config));
    }
    Ok(test)
}

/// Run the test described by `options` and print its result.
pub fn execute(options: RunOptions) -> Result<TestResult> {
    let config = Arc::new(load_config(&options)?);
    let test = build_test(&options, Arc::clone(&config))?;
    let harness = Harness::from_config(&config);

    let result = harness.execute(&test, &TracingLog, &Noop, &Noop);

    match options.format {
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
            println!("{json}");
        }
        OutputFormat::Human => print_human(test.name(), &result),
    }
    Ok(result)
}

/// Process exit code for a verdict: success for anything that is not a problem
pub fn exit_code(status: Status) -> i32 {
    match status {
        Status::Pass | Status::Warn | Status::Skip => 0,
        _ => 1,
    }
}

fn print_human(name: &str, result: &TestResult) {
    let status = match result.status {
        Status::Pass => result.status.as_str().green().bold(),
        Status::Skip | Status::NotRun => result.status.as_str().dimmed(),
        Status::Warn => result.status.as_str().yellow().bold(),
        Status::Fail | Status::Timeout | Status::Crash => result.status.as_str().red().bold(),
    };
    println!("{status} {name} ({}ms)", result.duration.as_millis());
    println!("  command: {}", result.command);
    if let Some(code) = result.returncode {
        println!("  returncode: {code}");
    }
    if !result.stdout.is_empty() {
        println!("{}", "  stdout:".bold());
        for line in result.stdout.lines() {
            println!("    {line}");
        }
    }
    if !result.stderr.is_empty() {
        println!("{}", "  stderr:".bold());
        for line in result.stderr.lines() {
            println!("    {line}");
        }
    }
    if !result.exception.is_empty() {
        println!("  {} {}", "exception:".red(), result.exception);
    }
}

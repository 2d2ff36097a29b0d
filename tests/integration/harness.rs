//! Full pipeline runs through `Harness` with a real executor

use serial_test::serial;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

use exectest::{CommandSpec, Harness, HarnessConfig, Noop, ProcessExecutor, Status, TestCase};

use super::helpers::*;

fn run(test: &TestCase) -> exectest::TestResult {
    Harness::new(ProcessExecutor::new()).execute(test, &Noop, &Noop, &Noop)
}

#[test]
#[serial]
fn test_failing_test_keeps_output_verbatim() {
    let test = TestCase::new("foobar", sh("printf 'this is some\\nstdout'; exit 1"));
    let result = run(&test);

    assert_eq!(result.status, Status::Fail);
    assert_eq!(result.returncode, Some(1));
    assert_eq!(result.stdout, "this is some\nstdout");
    assert!(!result.timed_out);
    assert!(!result.has_diagnostics());
}

#[test]
#[serial]
fn test_passing_test_records_run_metadata() {
    let test = TestCase::new("ok", sh("exit 0").with_env("PIGLIT_PLATFORM", "gbm"));
    let result = run(&test);

    assert_eq!(result.status, Status::Pass);
    assert_eq!(result.attempts, 1);
    assert_eq!(result.pids.len(), 1);
    assert_eq!(result.environment, "PIGLIT_PLATFORM=gbm");
    assert_eq!(result.command, "sh -c 'exit 0'");
    assert!(result.started_at.is_some());
    assert!(result.finished_at >= result.started_at);
}

#[test]
#[serial]
fn test_missing_executable_is_fail_with_diagnostics() {
    let command = CommandSpec::new(["/nonexistent/exectest-missing-binary"]).unwrap();
    let result = run(&TestCase::new("missing", command));

    assert_eq!(result.status, Status::Fail);
    assert_eq!(result.returncode, None);
    assert!(result.exception.contains("failed to launch"));
    assert_ne!(result.traceback, "");
}

#[test]
#[serial]
fn test_signal_death_is_crash() {
    let result = run(&TestCase::new("segv", sh("kill -SEGV $$")));

    assert_eq!(result.status, Status::Crash);
    assert_eq!(result.returncode, Some(-11));
}

#[test]
#[serial]
fn test_timeout_through_harness() {
    let command = CommandSpec::new(["sleep", "60"])
        .unwrap()
        .with_timeout(Duration::from_secs(1));
    let result = run(&TestCase::new("sleepy", command));

    assert_eq!(result.status, Status::Timeout);
    assert_all_gone(&result.pids);
}

#[test]
#[serial]
fn test_default_timeout_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("exectest.toml");
    fs::write(&path, "default_timeout_secs = 1\ngrace_period_ms = 100\n").unwrap();

    let config = HarnessConfig::load(&path).unwrap();
    let harness = Harness::from_config(&config);
    let test = TestCase::new("sleepy", CommandSpec::new(["sleep", "60"]).unwrap());
    let result = harness.execute(&test, &Noop, &Noop, &Noop);

    assert_eq!(result.status, Status::Timeout);
}

#[test]
#[serial]
fn test_no_timeout_config_lets_test_finish() {
    let config = HarnessConfig {
        no_timeout: true,
        ..HarnessConfig::default()
    };
    let command = sh("sleep 1; echo done").with_timeout(Duration::from_millis(100));
    let test = TestCase::new("slow", command);
    let result = Harness::from_config(&config).execute(&test, &Noop, &Noop, &Noop);

    assert_eq!(result.status, Status::Pass);
    assert_eq!(result.stdout, "done\n");
}

#[test]
#[serial]
fn test_working_directory_is_applied() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("marker.txt"), "here").unwrap();

    let test = TestCase::new("cwd", sh("cat marker.txt").with_cwd(dir.path()));
    let result = run(&test);

    assert_eq!(result.status, Status::Pass);
    assert_eq!(result.stdout, "here");
}

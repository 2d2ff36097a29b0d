//! The `exectest` binary

use serial_test::serial;
use std::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_exectest");

#[test]
#[serial]
fn test_run_prints_json_and_succeeds() {
    let output = Command::new(BIN)
        .args(["run", "--name", "hello", "--", "sh", "-c", "echo hi"])
        .env_remove("EXECTEST_WRAPPER")
        .output()
        .expect("failed to run exectest");

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["status"], "pass");
    assert_eq!(result["returncode"], 0);
    assert_eq!(result["stdout"], "hi\n");
}

#[test]
#[serial]
fn test_run_failure_exits_nonzero() {
    let output = Command::new(BIN)
        .args(["run", "--", "sh", "-c", "exit 3"])
        .env_remove("EXECTEST_WRAPPER")
        .output()
        .expect("failed to run exectest");

    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["status"], "fail");
    assert_eq!(result["returncode"], 3);
}

#[test]
#[serial]
fn test_run_passes_environment() {
    let output = Command::new(BIN)
        .args(["run", "--env", "GREETING=hello", "--", "sh", "-c", "printf %s \"$GREETING\""])
        .env_remove("EXECTEST_WRAPPER")
        .output()
        .expect("failed to run exectest");

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["stdout"], "hello");
    assert_eq!(result["environment"], "GREETING=hello");
}

#[test]
fn test_statuses_lists_every_status() {
    let output = Command::new(BIN)
        .arg("statuses")
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run exectest");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for status in ["notrun", "skip", "pass", "warn", "fail", "timeout", "crash"] {
        assert!(stdout.contains(status), "missing {status} in {stdout}");
    }
}

#[test]
fn test_malformed_env_is_rejected() {
    let output = Command::new(BIN)
        .args(["run", "--env", "NOEQUALS", "--", "true"])
        .output()
        .expect("failed to run exectest");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("KEY=VALUE"));
}

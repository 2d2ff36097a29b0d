//! Timeout enforcement against real process trees

use nix::sys::signal::Signal;
use serial_test::serial;
use std::time::Duration;

use exectest::process::signal_process;
use exectest::{CommandSpec, Execute, ProcessExecutor, Status, TestCase};

use super::helpers::*;

const ONE_SECOND: Duration = Duration::from_secs(1);

#[test]
#[serial]
fn test_sleeping_test_times_out_promptly() {
    let command = CommandSpec::new(["sleep", "60"]).unwrap().with_timeout(ONE_SECOND);
    let result = TestCase::new("sleep", command)
        .run(&ProcessExecutor::new())
        .unwrap();

    assert_eq!(result.status, Status::Timeout);
    assert!(result.timed_out);
    assert_eq!(result.returncode, None);
    assert!(result.duration >= ONE_SECOND);
    assert!(result.duration < Duration::from_secs(5), "took {:?}", result.duration);
}

#[test]
#[serial]
fn test_partial_output_survives_timeout() {
    let command = sh("echo started; echo warming up >&2; sleep 60").with_timeout(ONE_SECOND);
    let result = ProcessExecutor::new().execute(&command).unwrap();

    assert!(result.timed_out);
    assert_eq!(result.stdout, "started\n");
    assert_eq!(result.stderr, "warming up\n");
}

#[test]
#[serial]
fn test_children_are_killed_on_timeout() {
    let command = sh("sleep 60 & echo $!; sleep 60 & echo $!; wait").with_timeout(ONE_SECOND);
    let result = ProcessExecutor::new().execute(&command).unwrap();

    assert!(result.timed_out);
    let pids = parse_pids(&result.stdout);
    assert_eq!(pids.len(), 2, "stdout was {:?}", result.stdout);
    assert_all_gone(&pids);
    assert_all_gone(&result.pids);
}

#[test]
#[serial]
fn test_grandchildren_are_killed_on_timeout() {
    let command = sh("(sleep 60 & echo $!; wait) & wait").with_timeout(ONE_SECOND);
    let result = ProcessExecutor::new().execute(&command).unwrap();

    assert!(result.timed_out);
    let pids = parse_pids(&result.stdout);
    assert_eq!(pids.len(), 1, "stdout was {:?}", result.stdout);
    assert_all_gone(&pids);
}

#[test]
#[serial]
fn test_descendant_in_new_session_is_killed_on_timeout() {
    if !have_program("setsid") {
        eprintln!("setsid not available, skipping");
        return;
    }

    let command = sh("setsid sleep 60 & echo $!; wait").with_timeout(ONE_SECOND);
    let result = ProcessExecutor::new().execute(&command).unwrap();

    assert!(result.timed_out);
    let pids = parse_pids(&result.stdout);
    assert_eq!(pids.len(), 1, "stdout was {:?}", result.stdout);
    assert_all_gone(&pids);
}

#[test]
#[serial]
fn test_sigterm_resistant_test_is_killed_after_grace() {
    let command = sh("trap '' TERM; sleep 60 & echo $!; wait").with_timeout(ONE_SECOND);
    let executor = ProcessExecutor::new().with_grace_period(Duration::from_millis(200));
    let result = executor.execute(&command).unwrap();

    assert!(result.timed_out);
    assert!(result.duration < Duration::from_secs(5), "took {:?}", result.duration);
    assert_all_gone(&parse_pids(&result.stdout));
    assert_all_gone(&result.pids);
}

#[test]
#[serial]
fn test_fast_test_is_not_timed_out() {
    let command = sh("echo quick").with_timeout(Duration::from_secs(10));
    let result = TestCase::new("quick", command)
        .run(&ProcessExecutor::new())
        .unwrap();

    assert_eq!(result.status, Status::Pass);
    assert!(!result.timed_out);
    assert!(result.duration < Duration::from_secs(5));
}

#[test]
#[serial]
fn test_background_child_left_after_exit_is_killed() {
    let result = ProcessExecutor::new()
        .execute(&sh("sleep 60 >/dev/null 2>&1 & echo $!"))
        .unwrap();

    assert_eq!(result.returncode, Some(0));
    assert_all_gone(&parse_pids(&result.stdout));
}

#[test]
#[serial]
fn test_escaped_descendant_holding_stdout_does_not_pollute_output() {
    if !have_program("setsid") {
        eprintln!("setsid not available, skipping");
        return;
    }

    let command = sh("setsid sleep 5 & echo $!");
    let result = TestCase::new("leaky", command)
        .run(&ProcessExecutor::new())
        .unwrap();

    let pids = parse_pids(&result.stdout);
    for &pid in &pids {
        let _ = signal_process(pid, Signal::SIGKILL);
    }

    assert_eq!(result.status, Status::Pass);
    assert!(result.output_incomplete);
    assert_eq!(pids.len(), 1, "stdout was {:?}", result.stdout);
    assert_eq!(result.stdout.lines().count(), 1);
}

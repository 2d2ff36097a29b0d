//! Shared helpers for process-level tests

use std::thread;
use std::time::{Duration, Instant};

use exectest::process::is_running;
use exectest::CommandSpec;

/// `sh -c <script>` as a command
pub fn sh(script: &str) -> CommandSpec {
    CommandSpec::new(["sh", "-c", script]).expect("sh command is never empty")
}

/// Every line of `stdout` that parses as a PID
pub fn parse_pids(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect()
}

/// Whether `program` can be found and started
pub fn have_program(program: &str) -> bool {
    std::process::Command::new("sh")
        .args(["-c", &format!("command -v {program}")])
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// Poll until `pid` is no longer running; SIGKILL delivery is asynchronous.
pub fn wait_until_gone(pid: u32, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if !is_running(pid) {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    !is_running(pid)
}

/// Assert every PID is gone within a couple of seconds.
pub fn assert_all_gone(pids: &[u32]) {
    for &pid in pids {
        assert!(
            wait_until_gone(pid, Duration::from_secs(3)),
            "process {pid} survived the timeout kill"
        );
    }
}

//! Base policy turning a raw process outcome into a verdict

use crate::result::TestResult;
use crate::status::Status;

const NO_RETURNCODE_EXCEPTION: &str = "test process produced no return code";

/// Refine `result` in place from its return code and timeout flag.
///
/// Order matters: a timeout wins over everything, then the return code
/// decides. A missing return code without a timeout means the process never
/// ran, which is a failure of the harness to launch it.
pub fn interpret(result: &mut TestResult) {
    result.status = if result.timed_out {
        Status::Timeout
    } else {
        match result.returncode {
            Some(code) if code > 0 => Status::Fail,
            Some(code) if code < 0 => Status::Crash,
            Some(_) => Status::Pass,
            None => {
                if result.exception.is_empty() {
                    result.exception = NO_RETURNCODE_EXCEPTION.to_string();
                }
                if result.traceback.is_empty() {
                    result.traceback = format!("{}\ncommand: {}", result.exception, result.command);
                }
                Status::Fail
            }
        }
    };
}

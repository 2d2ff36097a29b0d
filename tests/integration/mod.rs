//! Integration tests for exectest
//!
//! These run real child processes: process-group termination on timeout,
//! the full harness pipeline with overlays, and the `exectest` binary.

pub mod cli;
pub mod harness;
pub mod helpers;
pub mod timeout;

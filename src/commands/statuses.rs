//! `exectest statuses`: list verdicts in severity order

use anyhow::Result;
use colored::Colorize;

use crate::status::Status;

/// Print every status, least severe first
pub fn execute() -> Result<()> {
    for status in Status::ALL {
        let marker = if status.is_problem() {
            "problem".red().to_string()
        } else {
            String::new()
        };
        println!("{:<8} {marker}", status.as_str());
    }
    Ok(())
}

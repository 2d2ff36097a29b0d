pub mod run;
pub mod statuses;

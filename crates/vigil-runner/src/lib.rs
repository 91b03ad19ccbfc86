//! External command execution for checks.
//!
//! Runs a check's command line through the shell, capturing stdout and
//! stderr separately along with wall-clock duration and exit status. An
//! optional timeout kills commands that hang.

pub mod exec;

pub use exec::{run, RunRequest};

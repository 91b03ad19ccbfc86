//! Change detection: unified-diff parsing and per-check trigger rules.
//!
//! Parses `git diff` output into changed-file summaries, then evaluates each
//! configured check's path globs and content patterns to decide whether the
//! change warrants running it.

pub mod parser;
pub mod rules;

pub use parser::{parse_changed_files, ChangeStatus, ChangedFile};
pub use rules::{evaluate, Decision};

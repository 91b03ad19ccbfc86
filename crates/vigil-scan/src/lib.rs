//! Log and file scanning: turn check output into records.
//!
//! Each parser here is line-oriented and forgiving: lines that do not
//! match the expected shape are skipped rather than failing the run.
//! Configured input files that do not exist produce placeholder records,
//! so a misconfigured or partially built workspace still reports.
//!
//! - [`warnings`] — Swift/Clang compiler warnings from build logs
//! - [`lint`] — markdownlint-style findings
//! - [`lockfile`] — SwiftPM `Package.resolved` pins matched against a
//!   local advisory list
//! - [`products`] — size (and optional digest) measurement of files a
//!   command produced
//! - [`collect`] — per-kind dispatch from a check config to records

pub mod collect;
pub mod lint;
pub mod lockfile;
pub mod products;
pub mod warnings;

pub use collect::collect_records;
pub use lint::parse_lint_findings;
pub use lockfile::{
    load_advisories, load_lockfile, match_advisories, parse_advisories, parse_lockfile, Advisory,
    DependencyPin,
};
pub use products::measure_products;
pub use warnings::parse_warnings;

//! Diffing, gating, and rendering of check results.
//!
//! [`diff_records`] partitions the current record set against the
//! baseline into added, removed, and changed; [`evaluate_gate`] turns
//! thresholds into violations; [`RunReport`] renders the whole run as
//! text, markdown, JSON, or SARIF.

pub mod diff;
pub mod gate;
pub mod render;
pub mod sarif;

pub use diff::{diff_records, total_value, RecordDiff, ValueChange};
pub use gate::{evaluate_gate, GateOutcome};
pub use render::{CheckReport, CommandSummary, RunReport};
pub use sarif::to_sarif;

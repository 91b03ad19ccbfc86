//! Flat-file history store for check results.
//!
//! Each check keeps two files under the history directory:
//!
//! ```text
//! .vigil/history/<check>/baseline.json   last accepted record set
//! .vigil/history/<check>/trend.csv       append-only date,records,total_value rows
//! ```
//!
//! Missing or unreadable files behave as a first run rather than an
//! error, so deleting the history directory resets every comparison.

pub mod store;
pub mod trend;

pub use store::{Baseline, HistoryStore};
pub use trend::TrendPoint;

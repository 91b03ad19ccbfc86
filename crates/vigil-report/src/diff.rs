use std::collections::{HashMap, HashSet};

use serde::Serialize;

use vigil_core::Record;

/// Partition of the current record set against the previous run's.
///
/// # Examples
///
/// ```
/// use vigil_core::Record;
/// use vigil_report::diff_records;
///
/// let current = vec![Record::new("a", "a"), Record::new("b", "b")];
/// let baseline = vec![Record::new("a", "a"), Record::new("c", "c")];
/// let diff = diff_records(&current, Some(&baseline), 0.0);
/// assert_eq!(diff.added.len(), 1);
/// assert_eq!(diff.removed.len(), 1);
/// assert_eq!(diff.unchanged, 1);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDiff {
    /// Records whose identity was not in the baseline.
    pub added: Vec<Record>,
    /// Baseline records whose identity is gone.
    pub removed: Vec<Record>,
    /// Records present in both with a different value.
    pub changed: Vec<ValueChange>,
    /// Records present in both and unchanged.
    pub unchanged: usize,
    /// No baseline existed, so nothing was compared. A first run
    /// establishes the baseline instead of flagging everything as new.
    pub first_run: bool,
}

impl RecordDiff {
    /// Returns `true` if anything was added, removed, or changed.
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty() || !self.changed.is_empty()
    }

    /// Added records that are not placeholders.
    pub fn new_findings(&self) -> usize {
        self.added.iter().filter(|r| !r.is_placeholder()).count()
    }
}

/// One record whose value moved between runs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueChange {
    /// The current record.
    pub record: Record,
    /// Its value in the baseline.
    pub previous: Option<i64>,
    /// Current minus previous, reading absent values as zero.
    pub delta: i64,
}

/// Diff the current records against a baseline set.
///
/// Matching is by record identity. For records present on both sides,
/// a value difference within `tolerance_percent` of the previous value
/// is treated as unchanged; size-like checks use this to ignore
/// incidental byte jitter.
///
/// With no baseline the result is marked [`RecordDiff::first_run`] and
/// all partitions are empty.
pub fn diff_records(
    current: &[Record],
    baseline: Option<&[Record]>,
    tolerance_percent: f64,
) -> RecordDiff {
    let Some(baseline) = baseline else {
        return RecordDiff {
            added: Vec::new(),
            removed: Vec::new(),
            changed: Vec::new(),
            unchanged: current.len(),
            first_run: true,
        };
    };

    let previous: HashMap<&str, &Record> =
        baseline.iter().map(|r| (r.id.as_str(), r)).collect();
    let current_ids: HashSet<&str> = current.iter().map(|r| r.id.as_str()).collect();

    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut unchanged = 0;

    for record in current {
        let Some(prev) = previous.get(record.id.as_str()) else {
            added.push(record.clone());
            continue;
        };
        if values_differ(record.value, prev.value, tolerance_percent) {
            let previous_value = prev.value;
            let delta = record.value.unwrap_or(0) - previous_value.unwrap_or(0);
            changed.push(ValueChange {
                record: record.clone(),
                previous: previous_value,
                delta,
            });
        } else {
            unchanged += 1;
        }
    }

    let removed = baseline
        .iter()
        .filter(|r| !current_ids.contains(r.id.as_str()))
        .cloned()
        .collect();

    RecordDiff {
        added,
        removed,
        changed,
        unchanged,
        first_run: false,
    }
}

fn values_differ(current: Option<i64>, previous: Option<i64>, tolerance_percent: f64) -> bool {
    match (current, previous) {
        (None, None) => false,
        (Some(now), Some(then)) => {
            if now == then {
                return false;
            }
            if tolerance_percent <= 0.0 || then == 0 {
                return true;
            }
            let percent = ((now - then).abs() as f64) / (then.abs() as f64) * 100.0;
            percent > tolerance_percent
        }
        _ => true,
    }
}

/// Summed value of a record set, for trend rows and growth gates.
pub fn total_value(records: &[Record]) -> i64 {
    records.iter().filter_map(|r| r.value).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sized(id: &str, bytes: i64) -> Record {
        Record::new(id, "size").with_value(bytes)
    }

    #[test]
    fn partition_added_removed_unchanged() {
        let current = vec![
            Record::new("keep", "keep"),
            Record::new("fresh", "fresh"),
        ];
        let baseline = vec![
            Record::new("keep", "keep"),
            Record::new("gone", "gone"),
        ];
        let diff = diff_records(&current, Some(&baseline), 0.0);

        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].id, "fresh");
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].id, "gone");
        assert_eq!(diff.unchanged, 1);
        assert!(!diff.first_run);
        assert!(diff.has_changes());
    }

    #[test]
    fn first_run_flags_nothing() {
        let current = vec![Record::new("a", "a"), Record::new("b", "b")];
        let diff = diff_records(&current, None, 0.0);

        assert!(diff.first_run);
        assert!(diff.added.is_empty());
        assert!(diff.removed.is_empty());
        assert_eq!(diff.unchanged, 2);
        assert!(!diff.has_changes());
    }

    #[test]
    fn value_change_produces_delta() {
        let current = vec![sized("app", 1100)];
        let baseline = vec![sized("app", 1000)];
        let diff = diff_records(&current, Some(&baseline), 0.0);

        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].previous, Some(1000));
        assert_eq!(diff.changed[0].delta, 100);
        assert_eq!(diff.unchanged, 0);
    }

    #[test]
    fn tolerance_absorbs_small_changes() {
        let current = vec![sized("app", 1009)];
        let baseline = vec![sized("app", 1000)];

        let strict = diff_records(&current, Some(&baseline), 0.0);
        assert_eq!(strict.changed.len(), 1);

        let tolerant = diff_records(&current, Some(&baseline), 1.0);
        assert!(tolerant.changed.is_empty());
        assert_eq!(tolerant.unchanged, 1);

        let bigger = vec![sized("app", 1011)];
        let beyond = diff_records(&bigger, Some(&baseline), 1.0);
        assert_eq!(beyond.changed.len(), 1);
    }

    #[test]
    fn shrinking_counts_as_change_too() {
        let current = vec![sized("app", 900)];
        let baseline = vec![sized("app", 1000)];
        let diff = diff_records(&current, Some(&baseline), 5.0);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].delta, -100);
    }

    #[test]
    fn value_appearing_or_vanishing_is_a_change() {
        let current = vec![sized("app", 100)];
        let baseline = vec![Record::new("app", "app")];
        let diff = diff_records(&current, Some(&baseline), 0.0);
        assert_eq!(diff.changed.len(), 1);
        assert_eq!(diff.changed[0].previous, None);
        assert_eq!(diff.changed[0].delta, 100);
    }

    #[test]
    fn new_findings_excludes_placeholders() {
        let current = vec![
            Record::new("real", "real finding"),
            Record::placeholder("missing/pattern"),
        ];
        let diff = diff_records(&current, Some(&[]), 0.0);
        assert_eq!(diff.added.len(), 2);
        assert_eq!(diff.new_findings(), 1);
    }

    #[test]
    fn identical_sets_have_no_changes() {
        let records = vec![sized("a", 1), sized("b", 2)];
        let diff = diff_records(&records, Some(&records.clone()), 0.0);
        assert!(!diff.has_changes());
        assert_eq!(diff.unchanged, 2);
    }

    #[test]
    fn total_value_sums_present_values() {
        let records = vec![
            sized("a", 100),
            sized("b", 200),
            Record::new("c", "no value"),
        ];
        assert_eq!(total_value(&records), 300);
        assert_eq!(total_value(&[]), 0);
    }
}

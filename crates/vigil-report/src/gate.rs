use serde::Serialize;

use vigil_core::{format_bytes, CommandOutcome, GateConfig, Record};

use crate::diff::{total_value, RecordDiff};

/// Result of evaluating a check's gate rules.
///
/// # Examples
///
/// ```
/// use vigil_core::GateConfig;
/// use vigil_report::{diff_records, evaluate_gate};
///
/// let gate = GateConfig {
///     max_records: Some(0),
///     ..GateConfig::default()
/// };
/// let records = vec![vigil_core::Record::new("w", "warning")];
/// let diff = diff_records(&records, None, 0.0);
/// let outcome = evaluate_gate(&gate, &records, &diff, None, None);
/// assert!(!outcome.passed);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GateOutcome {
    /// Whether every rule held.
    pub passed: bool,
    /// One line per violated rule.
    pub violations: Vec<String>,
}

/// Evaluate gate rules against the collected records and diff.
///
/// Each configured rule is checked independently; any violation fails
/// the gate. Placeholder records stand for missing inputs and are not
/// counted against `max_records` or `max_new`. The growth rule needs a
/// positive baseline total to compare against and is skipped on a
/// first run.
pub fn evaluate_gate(
    gate: &GateConfig,
    records: &[Record],
    diff: &RecordDiff,
    baseline_total: Option<i64>,
    command: Option<&CommandOutcome>,
) -> GateOutcome {
    let mut violations = Vec::new();

    if gate.require_success {
        if let Some(outcome) = command {
            if outcome.timed_out {
                violations.push("command timed out".to_string());
            } else if !outcome.success() {
                let code = outcome
                    .exit_code
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "killed".to_string());
                violations.push(format!("command failed (exit {code})"));
            }
        }
    }

    let findings = records.iter().filter(|r| !r.is_placeholder()).count();
    if let Some(max) = gate.max_records {
        if findings > max {
            violations.push(format!("{findings} records exceed max_records {max}"));
        }
    }

    if let Some(max) = gate.max_new {
        let new = diff.new_findings();
        if new > max {
            violations.push(format!("{new} new records exceed max_new {max}"));
        }
    }

    let total = total_value(records);
    if let Some(max) = gate.max_value {
        if total > max {
            violations.push(format!(
                "total {} exceeds max_value {}",
                format_bytes(total),
                format_bytes(max)
            ));
        }
    }

    if let Some(max_growth) = gate.max_growth_percent {
        if let Some(base) = baseline_total.filter(|b| *b > 0) {
            let growth = (total - base) as f64 / base as f64 * 100.0;
            if growth > max_growth {
                violations.push(format!(
                    "total grew {growth:.1}% (max {max_growth:.1}%), {} -> {}",
                    format_bytes(base),
                    format_bytes(total)
                ));
            }
        }
    }

    GateOutcome {
        passed: violations.is_empty(),
        violations,
    }
}

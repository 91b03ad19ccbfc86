use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use vigil_core::{format_bytes, CheckKind, CheckStatus, CommandOutcome, VigilError};

use crate::diff::{total_value, RecordDiff};
use crate::gate::GateOutcome;
use vigil_core::Record;

/// Compact command result embedded in reports; the full log stays out
/// of serialized output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSummary {
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl From<&CommandOutcome> for CommandSummary {
    fn from(outcome: &CommandOutcome) -> Self {
        Self {
            exit_code: outcome.exit_code,
            duration_ms: outcome.duration_ms,
            timed_out: outcome.timed_out,
        }
    }
}

/// Everything one check contributed to a run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    /// Check name from the configuration.
    pub name: String,
    /// What family of check ran.
    pub kind: CheckKind,
    /// Pass, fail, or skip.
    pub status: CheckStatus,
    /// Why the check ran or was skipped.
    pub reason: String,
    /// Command result, absent for checks that only measure files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandSummary>,
    /// Records the check produced.
    pub records: Vec<Record>,
    /// Comparison against the baseline, absent when skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<RecordDiff>,
    /// Gate evaluation, absent when skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<GateOutcome>,
}

impl CheckReport {
    /// A skipped check: trigger rules did not match.
    pub fn skipped(name: impl Into<String>, kind: CheckKind, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            status: CheckStatus::Skipped,
            reason: reason.into(),
            command: None,
            records: Vec::new(),
            diff: None,
            gate: None,
        }
    }

    fn status_symbol(&self) -> &'static str {
        match self.status {
            CheckStatus::Passed => "✓",
            CheckStatus::Failed => "✗",
            CheckStatus::Skipped => "-",
        }
    }
}

/// The full result of one `vigil run`.
///
/// # Examples
///
/// ```
/// use vigil_report::RunReport;
///
/// let report = RunReport::new(vec![]);
/// assert!(report.passed());
/// assert!(report.to_markdown().contains("Vigil Report"));
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Per-check results in execution order.
    pub checks: Vec<CheckReport>,
}

impl RunReport {
    pub fn new(checks: Vec<CheckReport>) -> Self {
        Self {
            generated_at: Utc::now(),
            checks,
        }
    }

    /// Returns `true` when no check failed.
    pub fn passed(&self) -> bool {
        !self.checks.iter().any(|c| c.status.is_failure())
    }

    fn counts(&self) -> (usize, usize, usize) {
        let passed = self
            .checks
            .iter()
            .filter(|c| c.status == CheckStatus::Passed)
            .count();
        let failed = self
            .checks
            .iter()
            .filter(|c| c.status == CheckStatus::Failed)
            .count();
        let skipped = self
            .checks
            .iter()
            .filter(|c| c.status == CheckStatus::Skipped)
            .count();
        (passed, failed, skipped)
    }

    /// Render the report as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String, VigilError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Render the report as GitHub-flavored markdown, suitable for a
    /// step summary or a PR comment.
    pub fn to_markdown(&self) -> String {
        let (passed, failed, skipped) = self.counts();
        let mut out = String::new();
        out.push_str("# Vigil Report\n\n");
        out.push_str(&format!(
            "**{} checks** — {passed} passed, {failed} failed, {skipped} skipped\n\n",
            self.checks.len()
        ));

        if !self.checks.is_empty() {
            out.push_str("| Check | Status | Records | New | Resolved | Total |\n");
            out.push_str("|-------|--------|---------|-----|----------|-------|\n");
            for check in &self.checks {
                let (new, resolved) = check
                    .diff
                    .as_ref()
                    .map(|d| (d.added.len(), d.removed.len()))
                    .unwrap_or((0, 0));
                let total = total_value(&check.records);
                let total_cell = if total > 0 {
                    format_bytes(total)
                } else {
                    "—".to_string()
                };
                out.push_str(&format!(
                    "| {} | {} {} | {} | {} | {} | {} |\n",
                    check.name,
                    check.status_symbol(),
                    check.status,
                    check.records.len(),
                    new,
                    resolved,
                    total_cell,
                ));
            }
            out.push('\n');
        }

        for check in &self.checks {
            let Some(gate) = &check.gate else { continue };
            if gate.passed {
                continue;
            }
            out.push_str(&format!("## {} failed\n\n", check.name));
            for violation in &gate.violations {
                out.push_str(&format!("- {violation}\n"));
            }
            out.push('\n');
        }

        for check in &self.checks {
            let Some(diff) = &check.diff else { continue };
            if diff.added.is_empty() {
                continue;
            }
            out.push_str(&format!("### New in {}\n\n", check.name));
            for record in diff.added.iter().take(10) {
                match &record.path {
                    Some(path) => out.push_str(&format!(
                        "- `{}` {}\n",
                        path.display(),
                        record.detail
                    )),
                    None => out.push_str(&format!("- {}\n", record.detail)),
                }
            }
            if diff.added.len() > 10 {
                out.push_str(&format!("- …and {} more\n", diff.added.len() - 10));
            }
            out.push('\n');
        }

        out
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (passed, failed, skipped) = self.counts();
        writeln!(f, "Check Results")?;
        writeln!(f, "=============")?;
        writeln!(f)?;

        if !self.checks.is_empty() {
            writeln!(
                f,
                "{:<24} {:<16} {:>6} {:>8} {:>10}",
                "Check", "Kind", "Status", "Records", "Total"
            )?;
            writeln!(f, "{}", "-".repeat(68))?;
            for check in &self.checks {
                let total = total_value(&check.records);
                let total_cell = if total > 0 {
                    format_bytes(total)
                } else {
                    "-".to_string()
                };
                writeln!(
                    f,
                    "{:<24} {:<16} {:>6} {:>8} {:>10}",
                    check.name,
                    check.kind.to_string(),
                    format!("{} {}", check.status_symbol(), check.status),
                    check.records.len(),
                    total_cell,
                )?;
            }
            writeln!(f)?;
        }

        for check in &self.checks {
            let Some(gate) = &check.gate else { continue };
            for violation in &gate.violations {
                writeln!(f, "  {} {}: {violation}", check.status_symbol(), check.name)?;
            }
        }

        writeln!(
            f,
            "Summary: {} checks, {passed} passed, {failed} failed, {skipped} skipped",
            self.checks.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_records;
    use crate::gate::evaluate_gate;
    use vigil_core::GateConfig;

    fn passing_check(name: &str) -> CheckReport {
        let records = vec![Record::new("w1", "unused variable 'x'")];
        let diff = diff_records(&records, Some(&records.clone()), 0.0);
        let gate = evaluate_gate(&GateConfig::default(), &records, &diff, None, None);
        CheckReport {
            name: name.to_string(),
            kind: CheckKind::SwiftWarnings,
            status: CheckStatus::Passed,
            reason: "1 file(s) matched".to_string(),
            command: None,
            records,
            diff: Some(diff),
            gate: Some(gate),
        }
    }

    fn failing_check(name: &str) -> CheckReport {
        let records = vec![
            Record::new("size", "50.0 MiB").with_value(52_428_800),
        ];
        let diff = diff_records(&records, Some(&[]), 0.0);
        let gate_config = GateConfig {
            max_value: Some(1024),
            ..GateConfig::default()
        };
        let gate = evaluate_gate(&gate_config, &records, &diff, None, None);
        CheckReport {
            name: name.to_string(),
            kind: CheckKind::BinarySize,
            status: CheckStatus::Failed,
            reason: "1 file(s) matched".to_string(),
            command: None,
            records,
            diff: Some(diff),
            gate: Some(gate),
        }
    }

    #[test]
    fn empty_report_passes() {
        let report = RunReport::new(vec![]);
        assert!(report.passed());
        let text = report.to_string();
        assert!(text.contains("0 checks"));
    }

    #[test]
    fn failed_check_fails_the_report() {
        let report = RunReport::new(vec![passing_check("warnings"), failing_check("app-size")]);
        assert!(!report.passed());
    }

    #[test]
    fn skipped_checks_do_not_fail() {
        let report = RunReport::new(vec![CheckReport::skipped(
            "docs",
            CheckKind::MarkdownLint,
            "no changed files matched",
        )]);
        assert!(report.passed());
    }

    #[test]
    fn text_render_lists_checks_and_violations() {
        let report = RunReport::new(vec![passing_check("warnings"), failing_check("app-size")]);
        let text = report.to_string();
        assert!(text.contains("Check Results"));
        assert!(text.contains("warnings"));
        assert!(text.contains("app-size"));
        assert!(text.contains("max_value"));
        assert!(text.contains("1 failed"));
    }

    #[test]
    fn markdown_has_table_and_failure_sections() {
        let report = RunReport::new(vec![failing_check("app-size")]);
        let md = report.to_markdown();
        assert!(md.contains("# Vigil Report"));
        assert!(md.contains("| app-size | ✗ fail |"));
        assert!(md.contains("## app-size failed"));
        assert!(md.contains("max_value"));
        assert!(md.contains("### New in app-size"));
    }

    #[test]
    fn markdown_caps_new_record_listing() {
        let records: Vec<Record> = (0..15)
            .map(|i| Record::new(format!("w{i}"), format!("warning {i}")))
            .collect();
        let diff = diff_records(&records, Some(&[]), 0.0);
        let check = CheckReport {
            name: "warnings".to_string(),
            kind: CheckKind::SwiftWarnings,
            status: CheckStatus::Passed,
            reason: String::new(),
            command: None,
            records,
            diff: Some(diff),
            gate: None,
        };
        let md = RunReport::new(vec![check]).to_markdown();
        assert!(md.contains("…and 5 more"));
    }

    #[test]
    fn json_round_trips_shape() {
        let report = RunReport::new(vec![passing_check("warnings")]);
        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["checks"][0]["name"], "warnings");
        assert_eq!(value["checks"][0]["status"], "passed");
        assert!(value["generatedAt"].is_string());
    }
}

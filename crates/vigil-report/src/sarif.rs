use vigil_core::CheckKind;

use crate::render::RunReport;

/// Convert a run report to SARIF v2.1.0 JSON.
///
/// Produces a standalone SARIF log with a single run containing every
/// non-placeholder record as a result. Intended for upload to GitHub
/// Code Scanning via `github/codeql-action/upload-sarif`; measurement
/// records (sizes, digests) are included at `note` level so the full
/// run stays visible in one log.
///
/// # Examples
///
/// ```
/// use vigil_report::{to_sarif, RunReport};
///
/// let sarif = to_sarif(&RunReport::new(vec![]));
/// assert_eq!(sarif["version"], "2.1.0");
/// ```
pub fn to_sarif(report: &RunReport) -> serde_json::Value {
    let rules = build_rules(report);
    let mut results = Vec::new();

    for check in &report.checks {
        for record in &check.records {
            if record.is_placeholder() {
                continue;
            }
            let mut entry = serde_json::json!({
                "ruleId": rule_id(check.kind),
                "level": kind_to_sarif_level(check.kind),
                "message": { "text": &record.detail },
            });
            if let Some(path) = &record.path {
                let mut location = serde_json::json!({
                    "physicalLocation": {
                        "artifactLocation": {
                            "uri": path.display().to_string()
                        }
                    }
                });
                if let Some(line) = record.line {
                    location["physicalLocation"]["region"] =
                        serde_json::json!({ "startLine": line });
                }
                entry["locations"] = serde_json::json!([location]);
            }
            results.push(entry);
        }
    }

    serde_json::json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/main/sarif-2.1/schema/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "vigil",
                    "version": env!("CARGO_PKG_VERSION"),
                    "informationUri": "https://github.com/vigil-ci/vigil",
                    "rules": rules
                }
            },
            "results": results
        }]
    })
}

fn rule_id(kind: CheckKind) -> String {
    format!("vigil/{kind}")
}

fn kind_to_sarif_level(kind: CheckKind) -> &'static str {
    match kind {
        CheckKind::SwiftWarnings | CheckKind::MarkdownLint => "warning",
        CheckKind::LockfileAudit => "error",
        CheckKind::BinarySize
        | CheckKind::ShaderStats
        | CheckKind::ReferenceImages
        | CheckKind::Command => "note",
    }
}

/// Build the SARIF `rules` array from the checks that produced records.
///
/// Deduplicates by check kind so each rule ID appears at most once.
fn build_rules(report: &RunReport) -> Vec<serde_json::Value> {
    let mut seen: Vec<CheckKind> = Vec::new();
    let mut rules = Vec::new();

    for check in &report.checks {
        if check.records.iter().all(|r| r.is_placeholder()) {
            continue;
        }
        if seen.contains(&check.kind) {
            continue;
        }
        seen.push(check.kind);

        rules.push(serde_json::json!({
            "id": rule_id(check.kind),
            "shortDescription": { "text": check.kind.to_string() },
            "defaultConfiguration": { "level": kind_to_sarif_level(check.kind) }
        }));
    }

    rules
}

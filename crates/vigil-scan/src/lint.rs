use std::collections::HashMap;

use vigil_core::Record;

/// Extract findings from markdownlint-style output.
///
/// Matches `path:line rule description` and `path:line:col rule
/// description` lines, where the rule token looks like
/// `MD013/line-length`. Other lines are skipped.
///
/// Identity is path + rule + description with any trailing bracketed
/// measurement stripped, so `[Expected: 80; Actual: 95]` becoming
/// `[Expected: 80; Actual: 102]` is still the same finding. Line
/// numbers are reported but excluded from identity.
///
/// # Examples
///
/// ```
/// use vigil_scan::parse_lint_findings;
///
/// let log = "docs/algorithm.md:12 MD013/line-length Line length [Expected: 80; Actual: 95]\n";
/// let records = parse_lint_findings(log);
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].line, Some(12));
/// ```
pub fn parse_lint_findings(log: &str) -> Vec<Record> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    let mut records = Vec::new();

    for raw in log.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let Some((location, rest)) = line.split_once(' ') else {
            continue;
        };
        let Some((path, line_no)) = parse_location(location) else {
            continue;
        };
        let (rule, description) = match rest.split_once(' ') {
            Some((rule, description)) => (rule, description.trim()),
            None => (rest, ""),
        };
        if !looks_like_rule(rule) {
            continue;
        }

        let base = format!("{path}|{rule}|{}", strip_measurement(description));
        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;
        let id = if *count > 1 {
            format!("{base}#{count}")
        } else {
            base
        };

        let detail = if description.is_empty() {
            rule.to_string()
        } else {
            format!("{rule} {description}")
        };
        records.push(Record::new(id, detail).with_location(path, line_no));
    }

    records
}

// "docs/x.md:12" or "docs/x.md:34:1"
fn parse_location(location: &str) -> Option<(String, u32)> {
    let (rest, last) = location.rsplit_once(':')?;
    let last_num = last.parse::<u32>().ok()?;
    if let Some((path, line)) = rest.rsplit_once(':') {
        if let Ok(line_no) = line.parse::<u32>() {
            return Some((path.to_string(), line_no));
        }
    }
    if rest.is_empty() {
        return None;
    }
    Some((rest.to_string(), last_num))
}

// markdownlint rule tokens: "MD013/line-length" or a bare "MD041"
fn looks_like_rule(token: &str) -> bool {
    let code = token.split('/').next().unwrap_or(token);
    code.len() > 2
        && code.starts_with("MD")
        && code[2..].chars().all(|c| c.is_ascii_digit())
}

// Drop a trailing "[...]" segment; it holds measured values that change
// with content while the finding stays the same.
fn strip_measurement(description: &str) -> &str {
    if description.ends_with(']') {
        if let Some(open) = description.rfind('[') {
            return description[..open].trim_end();
        }
    }
    description
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const LINT_LOG: &str = "\
docs/algorithm.md:12 MD013/line-length Line length [Expected: 80; Actual: 95]
docs/algorithm.md:34:1 MD040/fenced-code-language Fenced code blocks should have a language specified
README.md:5 MD033/no-inline-html Inline HTML [Element: img]
README.md:1:1 MD041/first-line-heading/first-line-h1 First line in a file should be a top-level heading
markdownlint-cli2 v0.12.1 (markdownlint v0.33.0)
Summary: 4 error(s)
";

    #[test]
    fn extracts_findings_with_locations() {
        let records = parse_lint_findings(LINT_LOG);
        assert_eq!(records.len(), 4);

        assert_eq!(records[0].path, Some(PathBuf::from("docs/algorithm.md")));
        assert_eq!(records[0].line, Some(12));
        assert!(records[0].detail.starts_with("MD013/line-length"));

        assert_eq!(records[1].line, Some(34));
        assert_eq!(records[3].line, Some(1));
    }

    #[test]
    fn tool_banner_and_summary_are_skipped() {
        let records = parse_lint_findings(LINT_LOG);
        assert!(records.iter().all(|r| !r.detail.contains("markdownlint-cli2")));
        assert!(records.iter().all(|r| !r.detail.contains("Summary")));
    }

    #[test]
    fn identity_survives_measurement_changes() {
        let a = parse_lint_findings(
            "docs/a.md:12 MD013/line-length Line length [Expected: 80; Actual: 95]\n",
        );
        let b = parse_lint_findings(
            "docs/a.md:12 MD013/line-length Line length [Expected: 80; Actual: 102]\n",
        );
        assert_eq!(a[0].id, b[0].id);
    }

    #[test]
    fn identity_excludes_line_number() {
        let a = parse_lint_findings("docs/a.md:12 MD033/no-inline-html Inline HTML\n");
        let b = parse_lint_findings("docs/a.md:30 MD033/no-inline-html Inline HTML\n");
        assert_eq!(a[0].id, b[0].id);
    }

    #[test]
    fn repeated_findings_get_ordinals() {
        let log = "\
docs/a.md:12 MD013/line-length Line length [Expected: 80; Actual: 95]
docs/a.md:40 MD013/line-length Line length [Expected: 80; Actual: 81]
";
        let records = parse_lint_findings(log);
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
        assert!(records[1].id.ends_with("#2"));
    }

    #[test]
    fn non_rule_tokens_are_skipped() {
        let records = parse_lint_findings("docs/a.md:12 notarule something\n");
        assert!(records.is_empty());
    }

    #[test]
    fn empty_log_yields_nothing() {
        assert!(parse_lint_findings("").is_empty());
    }
}

use std::path::{Path, PathBuf};

use vigil_core::{CheckConfig, CheckKind, CommandOutcome, Record, VigilError};

use crate::lint::parse_lint_findings;
use crate::lockfile::{load_advisories, load_lockfile, match_advisories};
use crate::products::measure_products;
use crate::warnings::parse_warnings;

/// Produce the records for one check from its command outcome and the
/// files under `root`.
///
/// Log-parsing kinds read the command's combined output; measuring
/// kinds resolve their product patterns; `lockfile-audit` reads its
/// configured files; plain `command` checks produce no records and
/// gate on exit status alone.
///
/// # Errors
///
/// Returns [`VigilError::Config`] when the check is missing something
/// its kind requires (a command to parse, product patterns to measure,
/// an advisory list to match against).
pub fn collect_records(
    check: &CheckConfig,
    outcome: Option<&CommandOutcome>,
    root: &Path,
) -> Result<Vec<Record>, VigilError> {
    match check.kind {
        CheckKind::SwiftWarnings => Ok(parse_warnings(&require_log(check, outcome)?)),
        CheckKind::MarkdownLint => Ok(parse_lint_findings(&require_log(check, outcome)?)),
        CheckKind::BinarySize | CheckKind::ShaderStats => {
            require_products(check)?;
            measure_products(root, &check.products, false)
        }
        CheckKind::ReferenceImages => {
            require_products(check)?;
            measure_products(root, &check.products, true)
        }
        CheckKind::LockfileAudit => audit_lockfile(check, root),
        CheckKind::Command => Ok(Vec::new()),
    }
}

fn require_log(
    check: &CheckConfig,
    outcome: Option<&CommandOutcome>,
) -> Result<String, VigilError> {
    let outcome = outcome.ok_or_else(|| {
        VigilError::Config(format!(
            "check '{}' ({}) requires a command",
            check.name, check.kind
        ))
    })?;
    Ok(outcome.combined_log())
}

fn require_products(check: &CheckConfig) -> Result<(), VigilError> {
    if check.products.is_empty() {
        return Err(VigilError::Config(format!(
            "check '{}' ({}) requires product patterns",
            check.name, check.kind
        )));
    }
    Ok(())
}

fn audit_lockfile(check: &CheckConfig, root: &Path) -> Result<Vec<Record>, VigilError> {
    let lock_rel = check
        .lockfile
        .clone()
        .unwrap_or_else(|| PathBuf::from("Package.resolved"));
    let Some(pins) = load_lockfile(&root.join(&lock_rel))? else {
        return Ok(vec![Record::placeholder(lock_rel.display().to_string())]);
    };
    let Some(advisories_rel) = &check.advisories else {
        return Err(VigilError::Config(format!(
            "check '{}' (lockfile-audit) requires an advisories file",
            check.name
        )));
    };
    let Some(advisories) = load_advisories(&root.join(advisories_rel))? else {
        return Ok(vec![Record::placeholder(
            advisories_rel.display().to_string(),
        )]);
    };
    Ok(match_advisories(&pins, &advisories))
}

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vigil_core::{Record, VigilError};

/// One dependency pin from a SwiftPM `Package.resolved` file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyPin {
    /// Lowercased package identity.
    pub identity: String,
    /// Source location (repository URL).
    pub location: String,
    /// Pinned version, absent for branch/revision pins.
    pub version: Option<String>,
    /// Pinned revision hash.
    pub revision: Option<String>,
}

/// One entry of the local advisory list.
///
/// The list is a JSON array checked into the repository; each entry
/// names an affected package and optionally a version range.
///
/// # Examples
///
/// ```
/// use vigil_scan::Advisory;
///
/// let json = r#"{
///     "id": "CVE-2022-3215",
///     "package": "swift-nio",
///     "affectedVersions": "<2.29.1",
///     "severity": "high",
///     "summary": "HTTP header injection"
/// }"#;
/// let advisory: Advisory = serde_json::from_str(json).unwrap();
/// assert_eq!(advisory.package, "swift-nio");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    /// Advisory identifier (CVE or vendor id).
    pub id: String,
    /// Package identity the advisory applies to.
    pub package: String,
    /// Affected version range, e.g. `"<2.29.1"` or `">=1.0.0, <1.4.2"`.
    /// Absent means every version is affected.
    #[serde(default)]
    pub affected_versions: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Parse `Package.resolved` content into dependency pins.
///
/// Handles both the current format (top-level `pins` array with
/// `identity`/`location`) and the version-1 format (`object.pins` with
/// `package`/`repositoryURL`). Identities are lowercased.
///
/// # Errors
///
/// Returns [`VigilError::Serialization`] for invalid JSON and
/// [`VigilError::Parse`] when no pins array is present.
pub fn parse_lockfile(contents: &str) -> Result<Vec<DependencyPin>, VigilError> {
    let doc: Value = serde_json::from_str(contents)?;
    let entries = doc
        .get("pins")
        .or_else(|| doc.get("object").and_then(|o| o.get("pins")))
        .and_then(Value::as_array)
        .ok_or_else(|| VigilError::Parse("lock file has no pins array".to_string()))?;

    let mut pins = Vec::with_capacity(entries.len());
    for entry in entries {
        let identity = entry
            .get("identity")
            .and_then(Value::as_str)
            .or_else(|| entry.get("package").and_then(Value::as_str));
        let Some(identity) = identity else {
            continue;
        };
        let location = entry
            .get("location")
            .and_then(Value::as_str)
            .or_else(|| entry.get("repositoryURL").and_then(Value::as_str))
            .unwrap_or_default();
        let state = entry.get("state");
        let field = |name: &str| {
            state
                .and_then(|s| s.get(name))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        pins.push(DependencyPin {
            identity: identity.to_lowercase(),
            location: location.to_string(),
            version: field("version"),
            revision: field("revision"),
        });
    }
    Ok(pins)
}

/// Read and parse a lock file, returning `Ok(None)` when it does not
/// exist so the caller can emit a placeholder record instead of failing.
pub fn load_lockfile(path: &Path) -> Result<Option<Vec<DependencyPin>>, VigilError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(parse_lockfile(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Parse an advisory list (JSON array).
///
/// # Errors
///
/// Returns [`VigilError::Serialization`] for invalid JSON.
pub fn parse_advisories(contents: &str) -> Result<Vec<Advisory>, VigilError> {
    Ok(serde_json::from_str(contents)?)
}

/// Read and parse an advisory list, returning `Ok(None)` when the file
/// does not exist.
pub fn load_advisories(path: &Path) -> Result<Option<Vec<Advisory>>, VigilError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(parse_advisories(&contents)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Match pins against advisories, producing one record per affected pin.
///
/// A pin without a version (branch or revision pin) matches only
/// advisories that declare no version range; there is nothing to
/// compare a range against.
pub fn match_advisories(pins: &[DependencyPin], advisories: &[Advisory]) -> Vec<Record> {
    let mut records = Vec::new();
    for advisory in advisories {
        for pin in pins {
            if !pin.identity.eq_ignore_ascii_case(&advisory.package) {
                continue;
            }
            if !advisory_applies(advisory, pin) {
                continue;
            }
            let version = pin.version.as_deref().unwrap_or("unversioned");
            let severity = advisory.severity.as_deref().unwrap_or("unknown");
            let summary = advisory.summary.as_deref().unwrap_or("no summary");
            let detail = format!(
                "{} {version} affected by {} ({severity}): {summary}",
                pin.identity, advisory.id
            );
            records.push(Record::new(
                format!("{}|{}", advisory.id, pin.identity),
                detail,
            ));
        }
    }
    records
}

fn advisory_applies(advisory: &Advisory, pin: &DependencyPin) -> bool {
    let Some(range) = advisory.affected_versions.as_deref() else {
        return true;
    };
    let Some(version) = pin.version.as_deref() else {
        return false;
    };
    version_in_range(version, range)
}

/// Whether `version` falls inside `range`.
///
/// A range is a comma-separated conjunction of comparators: `<`, `<=`,
/// `>`, `>=`, `=`, or a bare version meaning exact. Versions compare
/// numerically segment by segment with missing segments read as zero;
/// pre-release and build suffixes are ignored. Unparseable versions
/// never match.
///
/// # Examples
///
/// ```
/// use vigil_scan::lockfile::version_in_range;
///
/// assert!(version_in_range("2.28.0", "<2.29.1"));
/// assert!(version_in_range("1.2.0", ">=1.0.0, <1.4.2"));
/// assert!(!version_in_range("1.4.2", ">=1.0.0, <1.4.2"));
/// ```
pub fn version_in_range(version: &str, range: &str) -> bool {
    range
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .all(|comparator| comparator_holds(version, comparator))
}

fn comparator_holds(version: &str, comparator: &str) -> bool {
    let (op, target) = if let Some(t) = comparator.strip_prefix("<=") {
        ("<=", t)
    } else if let Some(t) = comparator.strip_prefix(">=") {
        (">=", t)
    } else if let Some(t) = comparator.strip_prefix('<') {
        ("<", t)
    } else if let Some(t) = comparator.strip_prefix('>') {
        (">", t)
    } else if let Some(t) = comparator.strip_prefix('=') {
        ("=", t)
    } else {
        ("=", comparator)
    };
    let Some(ordering) = compare_versions(version, target.trim()) else {
        return false;
    };
    match op {
        "<" => ordering == Ordering::Less,
        "<=" => ordering != Ordering::Greater,
        ">" => ordering == Ordering::Greater,
        ">=" => ordering != Ordering::Less,
        _ => ordering == Ordering::Equal,
    }
}

fn compare_versions(a: &str, b: &str) -> Option<Ordering> {
    let a = numeric_segments(a)?;
    let b = numeric_segments(b)?;
    let len = a.len().max(b.len());
    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            Ordering::Equal => continue,
            other => return Some(other),
        }
    }
    Some(Ordering::Equal)
}

fn numeric_segments(version: &str) -> Option<Vec<u64>> {
    let core = version
        .split(['-', '+'])
        .next()
        .unwrap_or(version)
        .trim_start_matches('v');
    core.split('.')
        .map(|segment| segment.parse::<u64>().ok())
        .collect()
}

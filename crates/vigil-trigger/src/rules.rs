use std::path::Path;

use glob::Pattern;
use serde::Serialize;

use vigil_core::{CheckConfig, VigilError};

use crate::parser::ChangedFile;

/// Outcome of trigger evaluation for one configured check.
///
/// # Examples
///
/// ```
/// use vigil_core::CheckConfig;
/// use vigil_trigger::{evaluate, parse_changed_files};
///
/// let toml = r#"
///     [[check]]
///     name = "warnings"
///     kind = "swift-warnings"
///     paths = ["**/*.swift"]
/// "#;
/// let config: vigil_core::VigilConfig = toml::from_str(toml).unwrap();
/// let diff = "diff --git a/src/align.swift b/src/align.swift\n\
///             --- a/src/align.swift\n\
///             +++ b/src/align.swift\n\
///             @@ -1 +1,2 @@\n\
///              a\n\
///             +b\n";
/// let files = parse_changed_files(diff).unwrap();
/// let decisions = evaluate(&config.checks, &files).unwrap();
/// assert!(decisions[0].run);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Name of the check the decision applies to.
    pub check: String,
    /// Whether the check should run.
    pub run: bool,
    /// Human-readable explanation of the decision.
    pub reason: String,
    /// Changed paths that matched the check's triggers.
    pub matched_paths: Vec<String>,
}

// Compiled trigger patterns for one check.
struct CompiledTriggers {
    paths: Vec<Pattern>,
    content: Vec<String>,
}

impl CompiledTriggers {
    fn compile(check: &CheckConfig) -> Result<Self, VigilError> {
        let mut paths = Vec::with_capacity(check.paths.len());
        for raw in &check.paths {
            let pattern = Pattern::new(raw).map_err(|e| {
                VigilError::Config(format!(
                    "check '{}': invalid path pattern '{raw}': {e}",
                    check.name
                ))
            })?;
            paths.push(pattern);
        }
        Ok(Self {
            paths,
            content: check.content_patterns.clone(),
        })
    }

    fn matches_path(&self, path: &Path) -> bool {
        self.paths.iter().any(|p| p.matches_path(path))
    }

    fn matches_content(&self, patch: &str) -> bool {
        self.content.iter().any(|needle| patch.contains(needle))
    }
}

/// Decide which checks should run given the set of changed files.
///
/// A check with no path patterns and no content patterns always runs.
/// Otherwise it runs when any changed file matches a path pattern (the
/// old path of a rename counts too) or any changed line contains a
/// content pattern.
///
/// # Errors
///
/// Returns [`VigilError::Config`] if a check declares an invalid glob
/// pattern.
pub fn evaluate(
    checks: &[CheckConfig],
    files: &[ChangedFile],
) -> Result<Vec<Decision>, VigilError> {
    let mut decisions = Vec::with_capacity(checks.len());

    for check in checks {
        let triggers = CompiledTriggers::compile(check)?;

        if triggers.paths.is_empty() && triggers.content.is_empty() {
            decisions.push(Decision {
                check: check.name.clone(),
                run: true,
                reason: "no triggers configured, always runs".to_string(),
                matched_paths: Vec::new(),
            });
            continue;
        }

        let mut matched_paths = Vec::new();
        let mut content_hit = false;

        for file in files {
            let path_hit = triggers.matches_path(&file.path)
                || file
                    .old_path
                    .as_deref()
                    .is_some_and(|old| triggers.matches_path(old));

            if path_hit {
                matched_paths.push(file.path.display().to_string());
            } else if !file.binary && triggers.matches_content(&file.patch) {
                matched_paths.push(file.path.display().to_string());
                content_hit = true;
            }
        }

        let run = !matched_paths.is_empty();
        let reason = if !run {
            "no changed files matched".to_string()
        } else if content_hit {
            format!("{} file(s) matched (content pattern)", matched_paths.len())
        } else {
            format!("{} file(s) matched", matched_paths.len())
        };

        decisions.push(Decision {
            check: check.name.clone(),
            run,
            reason,
            matched_paths,
        });
    }

    Ok(decisions)
}

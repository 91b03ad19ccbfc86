use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::VigilError;
use crate::types::CheckKind;

/// Top-level configuration loaded from `.vigil.toml`.
///
/// Declares the checks a run may execute, label rules for pull requests,
/// and where reports and history go.
///
/// # Examples
///
/// ```
/// use vigil_core::VigilConfig;
///
/// let config = VigilConfig::default();
/// assert!(config.checks.is_empty());
/// assert_eq!(config.history.dir.to_str(), Some(".vigil/history"));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VigilConfig {
    /// Source-hosting settings.
    #[serde(default)]
    pub github: GithubConfig,
    /// Notification targets.
    #[serde(default)]
    pub notify: NotifyConfig,
    /// History store settings.
    #[serde(default)]
    pub history: HistoryConfig,
    /// Configured checks, in execution order.
    #[serde(default, rename = "check")]
    pub checks: Vec<CheckConfig>,
    /// Label rules applied to pull requests by changed path.
    #[serde(default, rename = "label")]
    pub labels: Vec<LabelRule>,
}

impl VigilConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Io`] if the file cannot be read, or
    /// [`VigilError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use vigil_core::VigilConfig;
    /// use std::path::Path;
    ///
    /// let config = VigilConfig::from_file(Path::new(".vigil.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, VigilError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Toml`] if parsing fails, or
    /// [`VigilError::Config`] if two checks share a name.
    ///
    /// # Examples
    ///
    /// ```
    /// use vigil_core::VigilConfig;
    ///
    /// let toml = r#"
    /// [[check]]
    /// name = "docs"
    /// kind = "markdown-lint"
    /// command = "markdownlint '**/*.md'"
    /// "#;
    /// let config = VigilConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.checks.len(), 1);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, VigilError> {
        let config: Self = toml::from_str(content)?;
        for (i, check) in config.checks.iter().enumerate() {
            // Names key history directories, so path separators are out.
            if check.name.is_empty() || check.name.contains(['/', '\\']) {
                return Err(VigilError::Config(format!(
                    "invalid check name: {:?}",
                    check.name
                )));
            }
            if config.checks[..i].iter().any(|c| c.name == check.name) {
                return Err(VigilError::Config(format!(
                    "duplicate check name: {}",
                    check.name
                )));
            }
        }
        Ok(config)
    }

    /// Look up a configured check by name.
    pub fn find_check(&self, name: &str) -> Option<&CheckConfig> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// Source-hosting configuration.
///
/// The API token is never stored in the file; it comes from the
/// `GITHUB_TOKEN` environment variable or a CLI flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubConfig {
    /// Default repository in `owner/repo` form, used when a PR number
    /// is given without one.
    pub repository: Option<String>,
}

/// Notification targets for completed runs.
///
/// # Examples
///
/// ```
/// use vigil_core::NotifyConfig;
///
/// let config = NotifyConfig::default();
/// assert!(config.webhook_url.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Chat webhook that receives a JSON payload per run.
    pub webhook_url: Option<String>,
    /// Step-summary file the markdown report is appended to.
    /// Falls back to the `VIGIL_STEP_SUMMARY` / `GITHUB_STEP_SUMMARY`
    /// environment variables when unset.
    pub step_summary: Option<PathBuf>,
}

/// History store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Directory holding per-check baselines and trends.
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,
}

fn default_history_dir() -> PathBuf {
    PathBuf::from(".vigil/history")
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            dir: default_history_dir(),
        }
    }
}

/// One configured check: trigger, command, parser inputs, and gate.
///
/// # Examples
///
/// ```
/// use vigil_core::{CheckConfig, CheckKind};
///
/// let toml = r#"
/// name = "warnings"
/// kind = "swift-warnings"
/// command = "xcodebuild build"
/// paths = ["burstphoto/**/*.swift"]
/// tolerate_failure = true
/// "#;
/// let check: CheckConfig = toml::from_str(toml).unwrap();
/// assert_eq!(check.kind, CheckKind::SwiftWarnings);
/// assert!(check.tolerate_failure);
/// assert!(check.gate.max_new.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// Unique check name, used for history keys and report headings.
    pub name: String,
    /// What the check does with its command output.
    pub kind: CheckKind,
    /// Shell command to run. Optional for kinds that only measure files.
    pub command: Option<String>,
    /// Glob patterns over changed paths that trigger this check.
    /// Empty means the check runs on every change.
    #[serde(default)]
    pub paths: Vec<String>,
    /// Substrings of changed diff content that trigger this check.
    #[serde(default)]
    pub content_patterns: Vec<String>,
    /// Glob patterns of files the command produces, measured after it runs.
    #[serde(default)]
    pub products: Vec<String>,
    /// Dependency lock file for `lockfile-audit` checks.
    pub lockfile: Option<PathBuf>,
    /// Advisory list JSON for `lockfile-audit` checks.
    pub advisories: Option<PathBuf>,
    /// Auxiliary branch that `reference-images` output is committed to.
    pub publish_branch: Option<String>,
    /// Kill the command after this many seconds.
    pub timeout_secs: Option<u64>,
    /// Keep reporting when the command fails, instead of failing the check.
    #[serde(default)]
    pub tolerate_failure: bool,
    /// Ignore value changes smaller than this percentage when diffing.
    #[serde(default)]
    pub tolerance_percent: f64,
    /// Threshold rules converted to exit-code failures.
    #[serde(default)]
    pub gate: GateConfig,
}

/// Threshold rules for one check. Unset rules do not gate.
///
/// # Examples
///
/// ```
/// use vigil_core::GateConfig;
///
/// let gate = GateConfig::default();
/// assert!(gate.max_records.is_none());
/// assert!(!gate.require_success);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateConfig {
    /// Maximum number of records (placeholders excluded).
    pub max_records: Option<usize>,
    /// Maximum number of records not present in the baseline.
    pub max_new: Option<usize>,
    /// Maximum summed record value in bytes.
    pub max_value: Option<i64>,
    /// Maximum growth of the summed value versus the baseline, in percent.
    pub max_growth_percent: Option<f64>,
    /// Fail the check when its command exits non-zero, even if tolerated.
    #[serde(default)]
    pub require_success: bool,
}

impl GateConfig {
    /// Returns `true` if no rule is configured.
    pub fn is_empty(&self) -> bool {
        self.max_records.is_none()
            && self.max_new.is_none()
            && self.max_value.is_none()
            && self.max_growth_percent.is_none()
            && !self.require_success
    }
}

/// A pull-request label applied when changed paths match.
///
/// # Examples
///
/// ```
/// use vigil_core::LabelRule;
///
/// let toml = r#"
/// name = "shaders"
/// paths = ["**/*.metal"]
/// "#;
/// let rule: LabelRule = toml::from_str(toml).unwrap();
/// assert_eq!(rule.name, "shaders");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRule {
    /// Label text.
    pub name: String,
    /// Glob patterns over changed paths.
    pub paths: Vec<String>,
}

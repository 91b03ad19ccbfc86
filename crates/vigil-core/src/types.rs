use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Detail text used for records whose source file was absent.
pub const PLACEHOLDER_DETAIL: &str = "N/A";

/// One extracted finding or measurement from a check run.
///
/// The `id` is the record's diff identity: two runs that produce a record
/// with the same id are treated as reporting the same thing. Measurements
/// carry a numeric `value` (bytes); findings such as compiler warnings
/// leave it unset.
///
/// # Examples
///
/// ```
/// use vigil_core::Record;
///
/// let rec = Record::new("align.swift|unused variable 'x'", "unused variable 'x'")
///     .with_location("burstphoto/align.swift", 42);
/// assert_eq!(rec.line, Some(42));
/// assert!(rec.value.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Stable identity used for diffing against the previous run.
    pub id: String,
    /// Human-readable description of the finding or measurement.
    pub detail: String,
    /// Measured value in bytes, when the record is a measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
    /// Source path the record refers to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Line number in `path`, reported but excluded from identity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

impl Record {
    /// Create a record with an identity and detail text.
    pub fn new(id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            detail: detail.into(),
            value: None,
            path: None,
            line: None,
        }
    }

    /// Attach a measured value in bytes.
    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    /// Attach a source location.
    pub fn with_location(mut self, path: impl Into<PathBuf>, line: u32) -> Self {
        self.path = Some(path.into());
        self.line = Some(line);
        self
    }

    /// Attach a source path without a line number.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Create the placeholder record emitted when a configured input file
    /// does not exist. The run keeps going; the absence is reported instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use vigil_core::Record;
    ///
    /// let rec = Record::placeholder("build/Burst.app");
    /// assert!(rec.is_placeholder());
    /// assert!(rec.value.is_none());
    /// ```
    pub fn placeholder(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            id: source,
            detail: PLACEHOLDER_DETAIL.into(),
            value: None,
            path: None,
            line: None,
        }
    }

    /// Returns `true` if this record stands in for a missing input.
    pub fn is_placeholder(&self) -> bool {
        self.detail == PLACEHOLDER_DETAIL && self.value.is_none()
    }
}

/// The family of work a configured check performs.
///
/// Each kind pairs a command with a parser or measurement strategy.
///
/// # Examples
///
/// ```
/// use vigil_core::CheckKind;
///
/// let kind: CheckKind = "swift-warnings".parse().unwrap();
/// assert_eq!(kind, CheckKind::SwiftWarnings);
/// assert_eq!(kind.to_string(), "swift-warnings");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckKind {
    /// Run a build and track compiler warnings from its log.
    SwiftWarnings,
    /// Run a markdown linter and track its findings.
    MarkdownLint,
    /// Measure produced binaries against size limits.
    BinarySize,
    /// Match lock-file dependency pins against an advisory list.
    LockfileAudit,
    /// Compile shaders and measure the produced intermediates.
    ShaderStats,
    /// Regenerate reference images and track their content digests.
    ReferenceImages,
    /// Run a command and gate purely on its exit status.
    Command,
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckKind::SwiftWarnings => "swift-warnings",
            CheckKind::MarkdownLint => "markdown-lint",
            CheckKind::BinarySize => "binary-size",
            CheckKind::LockfileAudit => "lockfile-audit",
            CheckKind::ShaderStats => "shader-stats",
            CheckKind::ReferenceImages => "reference-images",
            CheckKind::Command => "command",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CheckKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "swift-warnings" => Ok(CheckKind::SwiftWarnings),
            "markdown-lint" => Ok(CheckKind::MarkdownLint),
            "binary-size" => Ok(CheckKind::BinarySize),
            "lockfile-audit" => Ok(CheckKind::LockfileAudit),
            "shader-stats" => Ok(CheckKind::ShaderStats),
            "reference-images" => Ok(CheckKind::ReferenceImages),
            "command" => Ok(CheckKind::Command),
            other => Err(format!("unknown check kind: {other}")),
        }
    }
}

/// Final status of one check within a run.
///
/// # Examples
///
/// ```
/// use vigil_core::CheckStatus;
///
/// assert_eq!(CheckStatus::Passed.to_string(), "pass");
/// assert!(!CheckStatus::Skipped.is_failure());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// All gate rules held.
    Passed,
    /// At least one gate rule was violated.
    Failed,
    /// The check's trigger rules did not match this change.
    Skipped,
}

impl CheckStatus {
    /// Returns `true` if this status should fail the run.
    pub fn is_failure(self) -> bool {
        matches!(self, CheckStatus::Failed)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Passed => write!(f, "pass"),
            CheckStatus::Failed => write!(f, "fail"),
            CheckStatus::Skipped => write!(f, "skip"),
        }
    }
}

/// Captured result of an external command invocation.
///
/// A failing command is not an error at this level: checks configured with
/// `tolerate_failure` parse the captured log regardless of exit status.
///
/// # Examples
///
/// ```
/// use vigil_core::CommandOutcome;
///
/// let outcome = CommandOutcome {
///     exit_code: Some(65),
///     stdout: String::new(),
///     stderr: "error: no such module".into(),
///     duration_ms: 1200,
///     timed_out: false,
/// };
/// assert!(!outcome.success());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    /// Exit code, or `None` if the process was killed.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Whether the command was killed by the configured timeout.
    pub timed_out: bool,
}

impl CommandOutcome {
    /// Returns `true` if the command exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }

    /// Standard output and standard error joined for log parsing.
    pub fn combined_log(&self) -> String {
        let mut log = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !log.is_empty() && !log.ends_with('\n') {
                log.push('\n');
            }
            log.push_str(&self.stderr);
        }
        log
    }
}

/// Output format for CLI subcommands.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use vigil_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable tables and summaries.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output for step summaries and PR comments.
    Markdown,
    /// SARIF v2.1.0 for code-scanning upload.
    Sarif,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Sarif => write!(f, "sarif"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "sarif" => Ok(OutputFormat::Sarif),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

/// Format a byte count for humans.
///
/// Negative values keep their sign so size deltas render naturally.
///
/// # Examples
///
/// ```
/// use vigil_core::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(2_621_440), "2.5 MiB");
/// assert_eq!(format_bytes(-1536), "-1.5 KiB");
/// ```
pub fn format_bytes(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes.unsigned_abs() as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let sign = if bytes < 0 { "-" } else { "" };
    if unit == 0 {
        format!("{sign}{} B", bytes.unsigned_abs())
    } else {
        format!("{sign}{value:.1} {}", UNITS[unit])
    }
}

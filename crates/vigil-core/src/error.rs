use std::path::PathBuf;

/// Errors that can occur across the Vigil pipeline.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use vigil_core::VigilError;
///
/// let err = VigilError::Config("missing check name".into());
/// assert!(err.to_string().contains("missing check name"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git or hosting API failure.
    #[error("git error: {0}")]
    Git(String),

    /// Log, diff, or lockfile parsing failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// External command failure.
    #[error("command error: {0}")]
    Command(String),

    /// History store read/write failure.
    #[error("history error: {0}")]
    History(String),

    /// Webhook or HTTP delivery failure.
    #[error("notify error: {0}")]
    Notify(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV read/write failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

use std::io::Write;
use std::path::{Path, PathBuf};

use vigil_core::VigilError;

/// Pick the step-summary file to write, if any.
///
/// Resolution order: an explicit CLI path, the configured path, the
/// `VIGIL_STEP_SUMMARY` environment variable, then `GITHUB_STEP_SUMMARY`
/// so runs inside GitHub Actions land in the job summary without any
/// configuration.
pub fn resolve_summary_path(
    cli_path: Option<&Path>,
    configured: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    for var in ["VIGIL_STEP_SUMMARY", "GITHUB_STEP_SUMMARY"] {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                return Some(PathBuf::from(value));
            }
        }
    }
    None
}

/// Append a markdown block to the step-summary file.
///
/// The file is created if missing; successive runs in one job append
/// their sections in order.
///
/// # Errors
///
/// Returns [`VigilError::Io`] on filesystem failures.
pub fn append_summary(path: &Path, markdown: &str) -> Result<(), VigilError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(markdown.as_bytes())?;
    if !markdown.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let resolved = resolve_summary_path(
            Some(Path::new("cli.md")),
            Some(Path::new("configured.md")),
        );
        assert_eq!(resolved, Some(PathBuf::from("cli.md")));
    }

    #[test]
    fn configured_path_is_second() {
        let resolved = resolve_summary_path(None, Some(Path::new("configured.md")));
        assert_eq!(resolved, Some(PathBuf::from("configured.md")));
    }

    #[test]
    fn append_creates_and_extends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.md");

        append_summary(&path, "# Vigil Report\n").unwrap();
        append_summary(&path, "second run").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# Vigil Report\n"));
        assert!(content.ends_with("second run\n"));
    }

    #[test]
    fn append_creates_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/summary.md");
        append_summary(&path, "content\n").unwrap();
        assert!(path.exists());
    }
}

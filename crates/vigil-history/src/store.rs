use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vigil_core::{Record, VigilError};

use crate::trend::{append_point, load_points, TrendPoint};

/// Snapshot of a check's records from the last accepted run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    /// Check the snapshot belongs to.
    pub check: String,

    /// When the snapshot was saved.
    pub saved_at: DateTime<Utc>,

    /// Commit the snapshot was taken at, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,

    /// The accepted record set, diffed against on the next run.
    #[serde(default)]
    pub records: Vec<Record>,
}

impl Baseline {
    pub fn new(check: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            check: check.into(),
            saved_at: Utc::now(),
            commit: None,
            records,
        }
    }

    pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }
}

/// Flat-file store of per-check baselines and trends.
///
/// # Examples
///
/// ```no_run
/// use vigil_history::{Baseline, HistoryStore};
///
/// let store = HistoryStore::new(".vigil/history");
/// let previous = store.load_baseline("swift-warnings").unwrap();
/// assert!(previous.is_none() || previous.unwrap().check == "swift-warnings");
/// ```
#[derive(Debug, Clone)]
pub struct HistoryStore {
    dir: PathBuf,
}

impl HistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding one check's files.
    pub fn check_dir(&self, check: &str) -> PathBuf {
        self.dir.join(check)
    }

    fn baseline_path(&self, check: &str) -> PathBuf {
        self.check_dir(check).join("baseline.json")
    }

    fn trend_path(&self, check: &str) -> PathBuf {
        self.check_dir(check).join("trend.csv")
    }

    /// Load a check's baseline.
    ///
    /// Returns `Ok(None)` when the baseline does not exist or does not
    /// parse; both mean the next diff runs against nothing, the same as
    /// a first run.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Io`] only when an existing file cannot be
    /// read.
    pub fn load_baseline(&self, check: &str) -> Result<Option<Baseline>, VigilError> {
        let path = self.baseline_path(check);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content).ok())
    }

    /// Save a check's baseline, creating its directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Io`] for filesystem failures.
    pub fn save_baseline(&self, baseline: &Baseline) -> Result<(), VigilError> {
        let dir = self.check_dir(&baseline.check);
        std::fs::create_dir_all(&dir)?;
        let content = serde_json::to_string_pretty(baseline)?;
        std::fs::write(self.baseline_path(&baseline.check), content)?;
        Ok(())
    }

    /// Append one point to a check's trend file.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Io`] or [`VigilError::Csv`] on write
    /// failures.
    pub fn append_trend(&self, check: &str, point: &TrendPoint) -> Result<(), VigilError> {
        std::fs::create_dir_all(self.check_dir(check))?;
        append_point(&self.trend_path(check), point)
    }

    /// Load a check's trend rows, oldest first. Missing files are empty.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Io`] if an existing file cannot be opened.
    pub fn load_trend(&self, check: &str) -> Result<Vec<TrendPoint>, VigilError> {
        load_points(&self.trend_path(check))
    }

    /// Names of checks that have any stored history.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Io`] if the history directory exists but
    /// cannot be listed.
    pub fn known_checks(&self) -> Result<Vec<String>, VigilError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Store rooted at a repository checkout; absolute configured
    /// directories are used as-is.
    pub fn for_repo(root: &Path, history_dir: &Path) -> Self {
        if history_dir.is_absolute() {
            Self::new(history_dir)
        } else {
            Self::new(root.join(history_dir))
        }
    }
}

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use vigil_core::VigilError;

/// How a file changed in a diff.
///
/// # Examples
///
/// ```
/// use vigil_trigger::ChangeStatus;
///
/// assert_eq!(ChangeStatus::Added.to_string(), "added");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    /// New file.
    Added,
    /// File removed.
    Deleted,
    /// Existing file edited in place.
    Modified,
    /// File moved to a new path.
    Renamed,
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeStatus::Added => write!(f, "added"),
            ChangeStatus::Deleted => write!(f, "deleted"),
            ChangeStatus::Modified => write!(f, "modified"),
            ChangeStatus::Renamed => write!(f, "renamed"),
        }
    }
}

/// Summary of one changed file in a unified diff.
///
/// Binary files are kept (with zero line counts) so path-based triggers
/// still see them; reference images and compiled products change as
/// binaries.
///
/// # Examples
///
/// ```
/// use vigil_trigger::parse_changed_files;
///
/// let diff = "diff --git a/src/align.swift b/src/align.swift\n\
///             --- a/src/align.swift\n\
///             +++ b/src/align.swift\n\
///             @@ -1,3 +1,4 @@\n\
///              let x = 1\n\
///             +let y = 2\n";
/// let files = parse_changed_files(diff).unwrap();
/// assert_eq!(files.len(), 1);
/// assert_eq!(files[0].added, 1);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedFile {
    /// Path of the file after the change (old path for deletions).
    pub path: PathBuf,
    /// Previous path when the file was renamed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<PathBuf>,
    /// Lines added.
    pub added: u32,
    /// Lines deleted.
    pub deleted: u32,
    /// Whether the diff marked the file as binary.
    pub binary: bool,
    /// Classification of the change.
    pub status: ChangeStatus,
    /// Concatenated `+`/`-` lines, used for content-pattern triggers.
    #[serde(skip)]
    pub patch: String,
}

impl fmt::Display for ChangedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, +{}/-{})",
            self.path.display(),
            self.status,
            self.added,
            self.deleted
        )
    }
}

// Per-file parse state before the change status can be derived.
struct PendingFile {
    old_path: PathBuf,
    new_path: PathBuf,
    added: u32,
    deleted: u32,
    binary: bool,
    is_new: bool,
    is_deleted: bool,
    is_rename: bool,
    in_hunk: bool,
    patch: String,
}

impl PendingFile {
    fn new() -> Self {
        Self {
            old_path: PathBuf::new(),
            new_path: PathBuf::new(),
            added: 0,
            deleted: 0,
            binary: false,
            is_new: false,
            is_deleted: false,
            is_rename: false,
            in_hunk: false,
            patch: String::new(),
        }
    }

    fn finish(self) -> ChangedFile {
        let status = if self.is_new {
            ChangeStatus::Added
        } else if self.is_deleted {
            ChangeStatus::Deleted
        } else if self.is_rename {
            ChangeStatus::Renamed
        } else {
            ChangeStatus::Modified
        };
        let path = if self.is_deleted {
            self.old_path.clone()
        } else {
            self.new_path.clone()
        };
        let old_path = if self.is_rename && self.old_path != self.new_path {
            Some(self.old_path)
        } else {
            None
        };
        ChangedFile {
            path,
            old_path,
            added: self.added,
            deleted: self.deleted,
            binary: self.binary,
            status,
            patch: self.patch,
        }
    }
}

/// Parse a unified diff (as produced by `git diff`) into changed-file
/// summaries with add/delete counts.
///
/// Handles new, deleted, renamed, and binary files. Plain patches without
/// the `diff --git` command line are accepted.
///
/// # Errors
///
/// Returns [`VigilError::Parse`] if a hunk header is malformed.
///
/// # Examples
///
/// ```
/// use vigil_trigger::parse_changed_files;
///
/// let files = parse_changed_files("").unwrap();
/// assert!(files.is_empty());
/// ```
pub fn parse_changed_files(input: &str) -> Result<Vec<ChangedFile>, VigilError> {
    let mut files: Vec<ChangedFile> = Vec::new();
    let mut current: Option<PendingFile> = None;

    for line in input.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some(file) = current.take() {
                files.push(file.finish());
            }
            let mut pending = PendingFile::new();
            // Paths on the command line cover renames and binary files,
            // which may carry no ---/+++ headers at all.
            if let Some((old, new)) = split_git_header_paths(rest) {
                pending.old_path = parse_path(old);
                pending.new_path = parse_path(new);
            }
            current = Some(pending);
            continue;
        }

        // Plain patches lack the "diff --git" command line entirely
        if line.starts_with("--- ") && current.is_none() {
            current = Some(PendingFile::new());
        }

        let Some(file) = current.as_mut() else {
            continue;
        };

        if (line.starts_with("Binary files ") && line.ends_with(" differ"))
            || line.starts_with("GIT binary patch")
        {
            file.binary = true;
            continue;
        }

        if line.starts_with("new file mode") {
            file.is_new = true;
            continue;
        }

        if line.starts_with("deleted file mode") {
            file.is_deleted = true;
            continue;
        }

        if let Some(path) = line.strip_prefix("rename from ") {
            file.is_rename = true;
            file.old_path = parse_path(path);
            continue;
        }

        if let Some(path) = line.strip_prefix("rename to ") {
            file.is_rename = true;
            file.new_path = parse_path(path);
            continue;
        }

        if line.starts_with("index ")
            || line.starts_with("similarity index")
            || line.starts_with("old mode")
            || line.starts_with("new mode")
        {
            continue;
        }

        if let Some(path) = line.strip_prefix("--- ") {
            file.old_path = parse_path(path);
            continue;
        }

        if let Some(path) = line.strip_prefix("+++ ") {
            file.new_path = parse_path(path);
            if path == "/dev/null" {
                file.is_deleted = true;
            }
            continue;
        }

        if line.starts_with("@@ ") {
            if !line[3..].contains(" @@") && !line[3..].ends_with("@@") {
                return Err(VigilError::Parse(format!("invalid hunk header: {line}")));
            }
            file.in_hunk = true;
            continue;
        }

        if line == "\\ No newline at end of file" {
            continue;
        }

        if file.in_hunk {
            if line.starts_with('+') {
                file.added += 1;
                file.patch.push_str(line);
                file.patch.push('\n');
            } else if line.starts_with('-') {
                file.deleted += 1;
                file.patch.push_str(line);
                file.patch.push('\n');
            }
        }
    }

    if let Some(file) = current.take() {
        files.push(file.finish());
    }

    Ok(files)
}

// "a/old path" "b/new path" with optional quoting; split at the " b/" that
// separates the two sides. Quoted or pathological names fall back to None
// and are resolved by the ---/+++ headers instead.
fn split_git_header_paths(rest: &str) -> Option<(&str, &str)> {
    if rest.starts_with('"') {
        return None;
    }
    let idx = rest.find(" b/")?;
    Some((&rest[..idx], &rest[idx + 1..]))
}

fn parse_path(raw: &str) -> PathBuf {
    let normalized = raw.trim_matches('"');

    if normalized == "/dev/null" {
        return PathBuf::from("/dev/null");
    }

    let stripped = normalized
        .strip_prefix("a/")
        .or_else(|| normalized.strip_prefix("b/"))
        .unwrap_or(normalized);

    PathBuf::from(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_diff_returns_empty_vec() {
        let files = parse_changed_files("").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn single_file_counts_lines() {
        let diff = "\
diff --git a/burstphoto/align.swift b/burstphoto/align.swift
index abc1234..def5678 100644
--- a/burstphoto/align.swift
+++ b/burstphoto/align.swift
@@ -10,4 +10,5 @@
 let tileSize = 16
+let searchDistance = 2
-let oldSetting = true
+let newSetting = false
 let done = true
";
        let files = parse_changed_files(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("burstphoto/align.swift"));
        assert_eq!(files[0].added, 2);
        assert_eq!(files[0].deleted, 1);
        assert_eq!(files[0].status, ChangeStatus::Modified);
        assert!(files[0].patch.contains("+let searchDistance = 2"));
        assert!(files[0].patch.contains("-let oldSetting = true"));
    }

    #[test]
    fn multiple_files() {
        let diff = "\
diff --git a/a.swift b/a.swift
--- a/a.swift
+++ b/a.swift
@@ -1 +1,2 @@
 line1
+line2
diff --git a/docs/readme.md b/docs/readme.md
--- a/docs/readme.md
+++ b/docs/readme.md
@@ -1 +1,2 @@
 line1
+line2
";
        let files = parse_changed_files(diff).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, PathBuf::from("a.swift"));
        assert_eq!(files[1].path, PathBuf::from("docs/readme.md"));
    }

    #[test]
    fn new_file() {
        let diff = "\
diff --git a/new.metal b/new.metal
new file mode 100644
--- /dev/null
+++ b/new.metal
@@ -0,0 +1,3 @@
+kernel void blur(
+    texture2d<float> in [[texture(0)]]
+) {}
";
        let files = parse_changed_files(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].status, ChangeStatus::Added);
        assert_eq!(files[0].path, PathBuf::from("new.metal"));
        assert_eq!(files[0].added, 3);
    }

    #[test]
    fn deleted_file_reports_old_path() {
        let diff = "\
diff --git a/old.swift b/old.swift
deleted file mode 100644
--- a/old.swift
+++ /dev/null
@@ -1,2 +0,0 @@
-func gone() {
-}
";
        let files = parse_changed_files(diff).unwrap();
        assert_eq!(files[0].status, ChangeStatus::Deleted);
        assert_eq!(files[0].path, PathBuf::from("old.swift"));
        assert_eq!(files[0].deleted, 2);
    }

    #[test]
    fn renamed_file_keeps_both_paths() {
        let diff = "\
diff --git a/shaders/old_name.metal b/shaders/new_name.metal
similarity index 100%
rename from shaders/old_name.metal
rename to shaders/new_name.metal
";
        let files = parse_changed_files(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].status, ChangeStatus::Renamed);
        assert_eq!(files[0].path, PathBuf::from("shaders/new_name.metal"));
        assert_eq!(
            files[0].old_path,
            Some(PathBuf::from("shaders/old_name.metal"))
        );
    }

    #[test]
    fn binary_files_kept_and_flagged() {
        let diff = "\
diff --git a/reference/scene1.dng b/reference/scene1.dng
Binary files a/reference/scene1.dng and b/reference/scene1.dng differ
diff --git a/code.swift b/code.swift
--- a/code.swift
+++ b/code.swift
@@ -1 +1,2 @@
 line1
+line2
";
        let files = parse_changed_files(diff).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].binary);
        assert_eq!(files[0].path, PathBuf::from("reference/scene1.dng"));
        assert_eq!(files[0].added, 0);
        assert!(!files[1].binary);
    }

    #[test]
    fn patch_without_git_header() {
        let diff = "\
--- /dev/null
+++ b/docs/notes.md
@@ -0,0 +1,2 @@
+# Notes
+First entry
";
        let files = parse_changed_files(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("docs/notes.md"));
        assert_eq!(files[0].added, 2);
    }

    #[test]
    fn no_newline_marker_ignored() {
        let diff = "\
diff --git a/f.txt b/f.txt
--- a/f.txt
+++ b/f.txt
@@ -1 +1 @@
-old
\\ No newline at end of file
+new
\\ No newline at end of file
";
        let files = parse_changed_files(diff).unwrap();
        assert_eq!(files[0].added, 1);
        assert_eq!(files[0].deleted, 1);
        assert!(!files[0].patch.contains("No newline"));
    }

    #[test]
    fn malformed_hunk_header_is_error() {
        let diff = "\
diff --git a/f.txt b/f.txt
--- a/f.txt
+++ b/f.txt
@@ broken
+new
";
        let result = parse_changed_files(diff);
        assert!(result.is_err());
    }

    #[test]
    fn quoted_paths_are_parsed() {
        let diff = r#"diff --git "a/docs/my notes.md" "b/docs/my notes.md"
--- "a/docs/my notes.md"
+++ "b/docs/my notes.md"
@@ -1 +1,2 @@
 old
+new
"#;
        let files = parse_changed_files(diff).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("docs/my notes.md"));
    }

    #[test]
    fn lines_outside_hunks_not_counted() {
        // The ---/+++ header lines themselves must not count as deletions
        let diff = "\
diff --git a/f.txt b/f.txt
--- a/f.txt
+++ b/f.txt
@@ -1,2 +1,2 @@
 context
-removed
+added
";
        let files = parse_changed_files(diff).unwrap();
        assert_eq!(files[0].added, 1);
        assert_eq!(files[0].deleted, 1);
    }

    #[test]
    fn display_summarizes_change() {
        let diff = "\
diff --git a/x.swift b/x.swift
--- a/x.swift
+++ b/x.swift
@@ -1 +1,2 @@
 a
+b
";
        let files = parse_changed_files(diff).unwrap();
        let shown = files[0].to_string();
        assert!(shown.contains("x.swift"));
        assert!(shown.contains("+1/-0"));
    }
}

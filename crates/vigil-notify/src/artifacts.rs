use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use vigil_core::VigilError;

/// One staged artifact file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactFile {
    /// Path relative to the repository root.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// SHA-256 content digest, hex encoded.
    pub digest: String,
}

/// Digest manifest written next to the staged files.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use vigil_notify::stage_artifacts;
///
/// let manifest = stage_artifacts(
///     Path::new("."),
///     &["reference/**/*.dng".to_string()],
///     Path::new(".vigil/artifacts"),
/// ).unwrap();
/// println!("{} files staged", manifest.files.len());
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    /// When the staging happened.
    pub generated_at: DateTime<Utc>,
    /// Staged files, sorted by path.
    pub files: Vec<ArtifactFile>,
}

/// Collect the files matched by `patterns` under `root` into `staging`,
/// preserving relative paths, and write a `manifest.json` digest list.
///
/// Patterns are plain globs, not ignore-aware: build outputs are
/// usually gitignored and must still be collected. A pattern matching
/// nothing stages nothing; the manifest simply omits it.
///
/// # Errors
///
/// Returns [`VigilError::Config`] for an invalid pattern and
/// [`VigilError::Io`] for filesystem failures.
pub fn stage_artifacts(
    root: &Path,
    patterns: &[String],
    staging: &Path,
) -> Result<ArtifactManifest, VigilError> {
    let root_pattern = glob::Pattern::escape(&root.display().to_string());
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();

    for pattern in patterns {
        let full = format!("{root_pattern}/{pattern}");
        let paths = glob::glob(&full)
            .map_err(|e| VigilError::Config(format!("invalid artifact pattern '{pattern}': {e}")))?;
        for entry in paths {
            let path = entry.map_err(|e| VigilError::Io(e.into()))?;
            stage_path(root, &path, staging, &mut seen, &mut files)?;
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    let manifest = ArtifactManifest {
        generated_at: Utc::now(),
        files,
    };

    std::fs::create_dir_all(staging)?;
    let json = serde_json::to_string_pretty(&manifest)?;
    std::fs::write(staging.join("manifest.json"), json)?;

    Ok(manifest)
}

fn stage_path(
    root: &Path,
    path: &Path,
    staging: &Path,
    seen: &mut HashSet<PathBuf>,
    files: &mut Vec<ArtifactFile>,
) -> Result<(), VigilError> {
    if !seen.insert(path.to_path_buf()) {
        return Ok(());
    }
    let metadata = std::fs::metadata(path)?;
    if metadata.is_dir() {
        for entry in std::fs::read_dir(path)? {
            stage_path(root, &entry?.path(), staging, seen, files)?;
        }
        return Ok(());
    }

    let rel = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    let dest = staging.join(&rel);
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(path, &dest)?;

    files.push(ArtifactFile {
        path: rel,
        size: metadata.len(),
        digest: file_digest(path)?,
    });
    Ok(())
}

fn file_digest(path: &Path) -> Result<String, VigilError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Commit the staged directory's contents to an auxiliary branch,
/// without touching the working tree or index, and optionally push it.
///
/// The branch is created when absent; otherwise the new commit extends
/// its head. Pushing shells out to `git push origin <branch>` so the
/// ambient credential setup of the CI job applies. Returns the short
/// commit id.
///
/// # Errors
///
/// Returns [`VigilError::Git`] on repository or push failures.
pub fn publish_branch(
    repo_root: &Path,
    branch: &str,
    staging: &Path,
    message: &str,
    push: bool,
) -> Result<String, VigilError> {
    let repo = git2::Repository::discover(repo_root).map_err(git_err)?;

    let tree_id = build_tree(&repo, staging)?;
    let tree = repo.find_tree(tree_id).map_err(git_err)?;

    let signature = repo
        .signature()
        .or_else(|_| git2::Signature::now("vigil", "vigil@localhost"))
        .map_err(git_err)?;

    let refname = format!("refs/heads/{branch}");
    let parent = match repo.find_branch(branch, git2::BranchType::Local) {
        Ok(existing) => Some(existing.get().peel_to_commit().map_err(git_err)?),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    let commit_id = repo
        .commit(Some(&refname), &signature, &signature, message, &tree, &parents)
        .map_err(git_err)?;
    let short = commit_id.to_string()[..8].to_string();

    if push {
        let output = std::process::Command::new("git")
            .args(["-C", &repo_root.to_string_lossy(), "push", "origin", branch])
            .output()
            .map_err(|e| VigilError::Git(format!("failed to run git push: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VigilError::Git(format!(
                "git push failed: {}",
                stderr.trim()
            )));
        }
    }

    Ok(short)
}

// Builds a git tree mirroring `dir`; the staging directory lives
// outside the work tree, so blobs are written from absolute paths.
fn build_tree(repo: &git2::Repository, dir: &Path) -> Result<git2::Oid, VigilError> {
    let mut builder = repo.treebuilder(None).map_err(git_err)?;
    let mut entries: Vec<_> = std::fs::read_dir(dir)
        .map_err(VigilError::Io)?
        .collect::<Result<_, _>>()
        .map_err(VigilError::Io)?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        if entry.file_type().map_err(VigilError::Io)?.is_dir() {
            let sub = build_tree(repo, &entry.path())?;
            builder
                .insert(Path::new(&name), sub, 0o040000)
                .map_err(git_err)?;
        } else {
            let blob = repo.blob_path(&entry.path()).map_err(git_err)?;
            builder
                .insert(Path::new(&name), blob, 0o100644)
                .map_err(git_err)?;
        }
    }
    builder.write().map_err(git_err)
}

fn git_err(e: git2::Error) -> VigilError {
    VigilError::Git(e.message().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, contents: &[u8]) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn staging_copies_files_and_writes_manifest() {
        let repo = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        write(repo.path(), "reference/scene1.dng", b"pixels-one");
        write(repo.path(), "reference/night/scene2.dng", b"pixels-two");
        write(repo.path(), "reference/notes.txt", b"not an image");

        let manifest = stage_artifacts(
            repo.path(),
            &["reference/**/*.dng".to_string()],
            staging.path(),
        )
        .unwrap();

        assert_eq!(manifest.files.len(), 2);
        assert_eq!(manifest.files[0].path, PathBuf::from("reference/night/scene2.dng"));
        assert_eq!(manifest.files[1].size, 10);
        assert!(staging.path().join("reference/scene1.dng").exists());
        assert!(!staging.path().join("reference/notes.txt").exists());

        let json = std::fs::read_to_string(staging.path().join("manifest.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["files"].as_array().unwrap().len(), 2);
        assert_eq!(value["files"][1]["digest"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn unmatched_pattern_stages_nothing() {
        let repo = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        let manifest =
            stage_artifacts(repo.path(), &["missing/**".to_string()], staging.path()).unwrap();
        assert!(manifest.files.is_empty());
        assert!(staging.path().join("manifest.json").exists());
    }

    #[test]
    fn directory_patterns_recurse() {
        let repo = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        write(repo.path(), "reference/a/x.dng", b"x");
        write(repo.path(), "reference/a/b/y.dng", b"y");

        let manifest =
            stage_artifacts(repo.path(), &["reference/a".to_string()], staging.path()).unwrap();
        assert_eq!(manifest.files.len(), 2);
    }

    fn init_repo(dir: &Path) -> git2::Repository {
        let repo = git2::Repository::init(dir).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "test").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }
        repo
    }

    #[test]
    fn publish_creates_branch_with_staged_tree() {
        let repo_dir = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        init_repo(repo_dir.path());
        write(staging.path(), "reference/scene1.dng", b"pixels");
        write(staging.path(), "manifest.json", b"{}");

        let short = publish_branch(
            repo_dir.path(),
            "ci/reference-images",
            staging.path(),
            "update reference images",
            false,
        )
        .unwrap();
        assert_eq!(short.len(), 8);

        let repo = git2::Repository::open(repo_dir.path()).unwrap();
        let branch = repo
            .find_branch("ci/reference-images", git2::BranchType::Local)
            .unwrap();
        let commit = branch.get().peel_to_commit().unwrap();
        assert_eq!(commit.message(), Some("update reference images"));

        let tree = commit.tree().unwrap();
        assert!(tree.get_path(Path::new("reference/scene1.dng")).is_ok());
        assert!(tree.get_path(Path::new("manifest.json")).is_ok());
    }

    #[test]
    fn publish_extends_existing_branch() {
        let repo_dir = tempfile::tempdir().unwrap();
        let staging = tempfile::tempdir().unwrap();
        init_repo(repo_dir.path());
        write(staging.path(), "scene1.dng", b"v1");

        publish_branch(repo_dir.path(), "ci/refs", staging.path(), "first", false).unwrap();

        write(staging.path(), "scene1.dng", b"v2");
        publish_branch(repo_dir.path(), "ci/refs", staging.path(), "second", false).unwrap();

        let repo = git2::Repository::open(repo_dir.path()).unwrap();
        let branch = repo.find_branch("ci/refs", git2::BranchType::Local).unwrap();
        let head = branch.get().peel_to_commit().unwrap();
        assert_eq!(head.message(), Some("second"));
        assert_eq!(head.parent_count(), 1);
        assert_eq!(head.parent(0).unwrap().message(), Some("first"));
    }
}

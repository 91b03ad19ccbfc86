use std::collections::HashSet;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use vigil_core::{format_bytes, Record, VigilError};

/// Measure the files a check's command produced.
///
/// Each glob pattern is resolved relative to `root`. Files are measured
/// by size; directories (app bundles) by the recursive sum of their
/// contents. A pattern that matches nothing yields one placeholder
/// record, so a broken build step surfaces as `N/A` instead of an
/// error. With `digests` on, each file's identity includes a content
/// digest, which makes any byte-level change show up in the diff even
/// when the size is unchanged.
///
/// # Errors
///
/// Returns [`VigilError::Config`] for an invalid glob pattern and
/// [`VigilError::Io`] when a matched file cannot be read.
pub fn measure_products(
    root: &Path,
    patterns: &[String],
    digests: bool,
) -> Result<Vec<Record>, VigilError> {
    let root_pattern = glob::Pattern::escape(&root.display().to_string());
    let mut measured: HashSet<PathBuf> = HashSet::new();
    let mut records = Vec::new();

    for pattern in patterns {
        let full = format!("{root_pattern}/{pattern}");
        let paths = glob::glob(&full)
            .map_err(|e| VigilError::Config(format!("invalid product pattern '{pattern}': {e}")))?;

        let mut matched_any = false;
        for entry in paths {
            let path = entry.map_err(|e| VigilError::Io(e.into()))?;
            matched_any = true;
            if !measured.insert(path.clone()) {
                continue;
            }
            records.push(measure_one(root, &path, digests)?);
        }

        if !matched_any {
            records.push(Record::placeholder(pattern.clone()));
        }
    }

    records.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(records)
}

fn measure_one(root: &Path, path: &Path, digests: bool) -> Result<Record, VigilError> {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let rel_display = rel.display().to_string();
    let metadata = std::fs::metadata(path)?;

    if metadata.is_dir() {
        let size = dir_size(path)? as i64;
        return Ok(Record::new(rel_display.clone(), format_bytes(size))
            .with_value(size)
            .with_path(rel));
    }

    let size = metadata.len() as i64;
    if digests {
        let digest = file_digest(path)?;
        let short = &digest[..12];
        Ok(
            Record::new(format!("{rel_display}@{short}"), format!("{} {short}", format_bytes(size)))
                .with_value(size)
                .with_path(rel),
        )
    } else {
        Ok(Record::new(rel_display, format_bytes(size))
            .with_value(size)
            .with_path(rel))
    }
}

fn dir_size(path: &Path) -> Result<u64, VigilError> {
    let mut total = 0;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}

fn file_digest(path: &Path) -> Result<String, VigilError> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{digest:x}"))
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
    fn measures_matched_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "build/air/align.air", &[0u8; 2048]);
        write(dir.path(), "build/air/merge.air", &[0u8; 512]);

        let records =
            measure_products(dir.path(), &["build/air/*.air".to_string()], false).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "build/air/align.air");
        assert_eq!(records[0].value, Some(2048));
        assert_eq!(records[0].detail, "2.0 KiB");
        assert_eq!(records[1].value, Some(512));
    }

    #[test]
    fn directory_size_is_recursive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Burst.app/Contents/MacOS/Burst", &[0u8; 1000]);
        write(dir.path(), "Burst.app/Contents/Resources/icon.icns", &[0u8; 500]);

        let records = measure_products(dir.path(), &["Burst.app".to_string()], false).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, Some(1500));
    }

    #[test]
    fn unmatched_pattern_yields_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let records =
            measure_products(dir.path(), &["build/missing/*.air".to_string()], false).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_placeholder());
        assert_eq!(records[0].id, "build/missing/*.air");
    }

    #[test]
    fn digest_identity_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "reference/scene1.dng", b"original pixels");
        let before =
            measure_products(dir.path(), &["reference/*.dng".to_string()], true).unwrap();

        write(dir.path(), "reference/scene1.dng", b"different pixels");
        let after = measure_products(dir.path(), &["reference/*.dng".to_string()], true).unwrap();

        assert_ne!(before[0].id, after[0].id);
        assert!(before[0].id.starts_with("reference/scene1.dng@"));
        // unchanged content keeps the identity
        let again = measure_products(dir.path(), &["reference/*.dng".to_string()], true).unwrap();
        assert_eq!(after[0].id, again[0].id);
    }

    #[test]
    fn overlapping_patterns_measure_once() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "out/app.bin", &[0u8; 64]);

        let records = measure_products(
            dir.path(),
            &["out/*.bin".to_string(), "out/app.bin".to_string()],
            false,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn records_sorted_by_id() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "out/zeta.bin", &[0u8; 1]);
        write(dir.path(), "out/alpha.bin", &[0u8; 1]);

        let records = measure_products(dir.path(), &["out/*.bin".to_string()], false).unwrap();
        assert_eq!(records[0].id, "out/alpha.bin");
        assert_eq!(records[1].id, "out/zeta.bin");
    }

    #[test]
    fn invalid_pattern_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = measure_products(dir.path(), &["[bad".to_string()], false);
        assert!(matches!(result, Err(VigilError::Config(_))));
    }
}

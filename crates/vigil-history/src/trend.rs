use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use vigil_core::VigilError;

/// One appended row of a check's trend file.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use vigil_history::TrendPoint;
///
/// let point = TrendPoint::new(
///     NaiveDate::from_ymd_opt(2026, 8, 22).unwrap(),
///     14,
///     52_428_800,
/// );
/// assert_eq!(point.records, 14);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Day the run happened.
    pub date: NaiveDate,
    /// Number of records (placeholders excluded).
    pub records: usize,
    /// Summed record value in bytes; zero for checks without values.
    pub total_value: i64,
}

impl TrendPoint {
    pub fn new(date: NaiveDate, records: usize, total_value: i64) -> Self {
        Self {
            date,
            records,
            total_value,
        }
    }
}

/// Append one row to a trend file, writing the header when the file is
/// created.
///
/// # Errors
///
/// Returns [`VigilError::Io`] for filesystem failures and
/// [`VigilError::Csv`] if the row cannot be written.
pub fn append_point(path: &Path, point: &TrendPoint) -> Result<(), VigilError> {
    let exists = path.exists();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(!exists)
        .from_writer(file);
    writer.serialize(point)?;
    writer.flush()?;
    Ok(())
}

/// Read every parseable row of a trend file.
///
/// A missing file yields an empty list; rows that fail to parse are
/// skipped, so a truncated write does not poison the whole trend.
///
/// # Errors
///
/// Returns [`VigilError::Io`] if an existing file cannot be opened.
pub fn load_points(path: &Path) -> Result<Vec<TrendPoint>, VigilError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)?;
    Ok(reader.deserialize().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trend.csv");

        append_point(&path, &TrendPoint::new(day(20), 12, 1024)).unwrap();
        append_point(&path, &TrendPoint::new(day(21), 11, 980)).unwrap();

        let points = load_points(&path).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], TrendPoint::new(day(20), 12, 1024));
        assert_eq!(points[1].records, 11);
    }

    #[test]
    fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trend.csv");

        append_point(&path, &TrendPoint::new(day(20), 1, 0)).unwrap();
        append_point(&path, &TrendPoint::new(day(21), 2, 0)).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw.matches("date,records,total_value").count(), 1);
        assert_eq!(raw.lines().count(), 3);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let points = load_points(&dir.path().join("trend.csv")).unwrap();
        assert!(points.is_empty());
    }

    #[test]
    fn corrupt_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trend.csv");
        std::fs::write(
            &path,
            "date,records,total_value\n2026-08-20,12,1024\nnot,a,row\n2026-08-21,11,980\n",
        )
        .unwrap();

        let points = load_points(&path).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].date, day(21));
    }
}

use std::collections::HashMap;

use vigil_core::Record;

/// Extract compiler warnings from a Swift/Clang build log.
///
/// Matches the `path:line:col: warning: message` shape the Swift and
/// Clang frontends emit, plus tool-prefixed forms like
/// `ld: warning: message` and bare `warning: message` lines. Errors,
/// notes, and everything else are ignored.
///
/// A warning's identity is its path and message, not its line number,
/// so editing code above a warning does not make it read as new. When
/// the same path and message occur more than once, later occurrences
/// get an ordinal suffix so counts still diff correctly.
///
/// # Examples
///
/// ```
/// use vigil_scan::parse_warnings;
///
/// let log = "\
/// burstphoto/align.swift:42:17: warning: variable 'dist' was never used
/// burstphoto/align.swift:48:1: error: cannot find 'tile' in scope
/// ";
/// let records = parse_warnings(log);
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].line, Some(42));
/// ```
pub fn parse_warnings(log: &str) -> Vec<Record> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    let mut records = Vec::new();

    for raw in log.lines() {
        let line = raw.trim_end();
        let Some((left, message)) = split_warning(line) else {
            continue;
        };
        let message = message.trim();
        if message.is_empty() {
            continue;
        }

        let (prefix, location) = parse_location(left);
        let base = if prefix.is_empty() {
            message.to_string()
        } else {
            format!("{prefix}|{message}")
        };

        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;
        let id = if *count > 1 {
            format!("{base}#{count}")
        } else {
            base
        };

        let mut record = Record::new(id, message);
        if let Some((path, line_no)) = location {
            record = record.with_location(path, line_no);
        }
        records.push(record);
    }

    records
}

fn split_warning(line: &str) -> Option<(&str, &str)> {
    if let Some(rest) = line.strip_prefix("warning: ") {
        return Some(("", rest));
    }
    line.split_once(": warning: ")
}

// "path:line:col" or "path:line" gives a source location; anything else
// (a tool name like "ld") only contributes to the identity.
fn parse_location(left: &str) -> (String, Option<(String, u32)>) {
    let left = left.trim();
    if let Some((rest, last)) = left.rsplit_once(':') {
        if last.parse::<u32>().is_ok() {
            if let Some((path, line)) = rest.rsplit_once(':') {
                if let Ok(line_no) = line.parse::<u32>() {
                    return (path.to_string(), Some((path.to_string(), line_no)));
                }
            }
            if let Ok(line_no) = last.parse::<u32>() {
                if !rest.is_empty() {
                    return (rest.to_string(), Some((rest.to_string(), line_no)));
                }
            }
        }
    }
    (left.to_string(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const BUILD_LOG: &str = "\
Build settings from command line:
    SCHEME = Burst

/ci/burst/burstphoto/align/align.swift:42:17: warning: variable 'searchDist' was never used; consider replacing with '_' or removing it
/ci/burst/burstphoto/io/dng.c:1203:9: warning: unused variable 'status' [-Wunused-variable]
/ci/burst/burstphoto/align/align.swift:88:5: error: cannot find 'tileSize' in scope
/ci/burst/burstphoto/align/align.swift:88:5: note: did you mean 'tileSizes'?
ld: warning: object file was built for newer macOS version (13.0) than being linked (12.0)
warning: Metal API validation enabled
** BUILD SUCCEEDED **
";

    #[test]
    fn extracts_located_warnings() {
        let records = parse_warnings(BUILD_LOG);
        assert_eq!(records.len(), 4);

        let swift = &records[0];
        assert_eq!(
            swift.path,
            Some(PathBuf::from("/ci/burst/burstphoto/align/align.swift"))
        );
        assert_eq!(swift.line, Some(42));
        assert!(swift.detail.contains("was never used"));

        let clang = &records[1];
        assert!(clang.detail.contains("[-Wunused-variable]"));
        assert_eq!(clang.line, Some(1203));
    }

    #[test]
    fn errors_and_notes_are_ignored() {
        let records = parse_warnings(BUILD_LOG);
        assert!(records.iter().all(|r| !r.detail.contains("cannot find")));
        assert!(records.iter().all(|r| !r.detail.contains("did you mean")));
    }

    #[test]
    fn tool_prefixed_warning_has_no_location() {
        let records = parse_warnings(BUILD_LOG);
        let ld = records
            .iter()
            .find(|r| r.detail.contains("newer macOS version"))
            .unwrap();
        assert!(ld.path.is_none());
        assert!(ld.id.starts_with("ld|"));
    }

    #[test]
    fn bare_warning_line_is_kept() {
        let records = parse_warnings(BUILD_LOG);
        let bare = records
            .iter()
            .find(|r| r.detail.contains("Metal API validation"))
            .unwrap();
        assert!(bare.path.is_none());
        assert_eq!(bare.id, "Metal API validation enabled");
    }

    #[test]
    fn identity_excludes_line_number() {
        let before = "src/merge.swift:10:3: warning: result of call to 'merge' is unused\n";
        let after = "src/merge.swift:57:3: warning: result of call to 'merge' is unused\n";
        let a = parse_warnings(before);
        let b = parse_warnings(after);
        assert_eq!(a[0].id, b[0].id);
        assert_ne!(a[0].line, b[0].line);
    }

    #[test]
    fn identity_includes_message_text() {
        let a = parse_warnings("src/x.swift:1:1: warning: variable 'a' was never used\n");
        let b = parse_warnings("src/x.swift:1:1: warning: variable 'b' was never used\n");
        assert_ne!(a[0].id, b[0].id);
    }

    #[test]
    fn duplicates_get_ordinal_suffixes() {
        let log = "\
src/x.swift:5:1: warning: 'init()' is deprecated
src/x.swift:9:1: warning: 'init()' is deprecated
src/x.swift:14:1: warning: 'init()' is deprecated
";
        let records = parse_warnings(log);
        assert_eq!(records.len(), 3);
        assert_ne!(records[0].id, records[1].id);
        assert!(records[1].id.ends_with("#2"));
        assert!(records[2].id.ends_with("#3"));
    }

    #[test]
    fn duplicate_ids_are_stable_across_runs() {
        let log = "\
src/x.swift:5:1: warning: 'init()' is deprecated
src/x.swift:9:1: warning: 'init()' is deprecated
";
        let a = parse_warnings(log);
        let b = parse_warnings(log);
        assert_eq!(a[0].id, b[0].id);
        assert_eq!(a[1].id, b[1].id);
    }

    #[test]
    fn path_line_without_column_is_located() {
        let records = parse_warnings("Sources/App/main.swift:7: warning: something odd\n");
        assert_eq!(records[0].line, Some(7));
        assert_eq!(records[0].path, Some(PathBuf::from("Sources/App/main.swift")));
    }

    #[test]
    fn empty_log_yields_nothing() {
        assert!(parse_warnings("").is_empty());
        assert!(parse_warnings("** BUILD SUCCEEDED **\n").is_empty());
    }
}

use std::path::PathBuf;

use vigil_core::VigilConfig;
use vigil_trigger::{evaluate, parse_changed_files, ChangeStatus};

const SWIFT_DIFF: &str = include_str!("fixtures/swift.diff");

fn burst_photo_config() -> VigilConfig {
    let toml = r#"
        [[check]]
        name = "swift-warnings"
        kind = "swift-warnings"
        paths = ["**/*.swift", "**/*.xcodeproj/**"]

        [[check]]
        name = "markdown-lint"
        kind = "markdown-lint"
        paths = ["**/*.md"]

        [[check]]
        name = "binary-size"
        kind = "binary-size"
        paths = ["burstphoto/**", "**/*.xcodeproj/**"]

        [[check]]
        name = "lockfile-audit"
        kind = "lockfile-audit"
        paths = ["Package.resolved"]

        [[check]]
        name = "shader-stats"
        kind = "shader-stats"
        paths = ["**/*.metal"]

        [[check]]
        name = "reference-images"
        kind = "reference-images"
        paths = ["burstphoto/align/**", "burstphoto/merge/**", "**/*.metal"]
        content_patterns = ["searchDist"]
    "#;
    toml::from_str(toml).unwrap()
}

#[test]
fn fixture_diff_parses_all_files() {
    let files = parse_changed_files(SWIFT_DIFF).unwrap();
    assert_eq!(files.len(), 5);

    let align = &files[0];
    assert_eq!(align.path, PathBuf::from("burstphoto/align/align.swift"));
    assert_eq!(align.status, ChangeStatus::Modified);
    assert_eq!(align.added, 2);
    assert_eq!(align.deleted, 1);

    let dng = &files[4];
    assert!(dng.binary);
    assert_eq!(dng.path, PathBuf::from("reference/scene1_night.dng"));
}

#[test]
fn fixture_diff_triggers_expected_checks() {
    let files = parse_changed_files(SWIFT_DIFF).unwrap();
    let config = burst_photo_config();
    let decisions = evaluate(&config.checks, &files).unwrap();

    let by_name = |name: &str| {
        decisions
            .iter()
            .find(|d| d.check == name)
            .unwrap_or_else(|| panic!("missing decision for {name}"))
    };

    assert!(by_name("swift-warnings").run);
    assert!(by_name("markdown-lint").run);
    assert!(by_name("binary-size").run);
    assert!(by_name("lockfile-audit").run);
    assert!(by_name("shader-stats").run);
    assert!(by_name("reference-images").run);

    assert_eq!(
        by_name("lockfile-audit").matched_paths,
        vec!["Package.resolved"]
    );
    assert!(by_name("shader-stats")
        .matched_paths
        .contains(&"burstphoto/metal/align.metal".to_string()));
}

#[test]
fn docs_only_diff_skips_build_checks() {
    let diff = "\
diff --git a/docs/algorithm.md b/docs/algorithm.md
--- a/docs/algorithm.md
+++ b/docs/algorithm.md
@@ -1 +1,2 @@
 # Algorithm
+Clarified the merge description.
";
    let files = parse_changed_files(diff).unwrap();
    let config = burst_photo_config();
    let decisions = evaluate(&config.checks, &files).unwrap();

    for decision in &decisions {
        if decision.check == "markdown-lint" {
            assert!(decision.run, "markdown-lint should run for a docs change");
        } else {
            assert!(!decision.run, "{} should not run", decision.check);
        }
    }
}

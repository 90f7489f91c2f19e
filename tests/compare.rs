// tests/compare.rs

use snapcheck::change::{ChangeKind, CollectingVisitor, FirstChange, PropertyDirection, TaskStateChange};
use snapcheck::fingerprint::{
    CompareOptions, FingerprintCompareStrategy, FingerprintEntry, NormalizedFingerprint,
};
use snapcheck::hash::hash_bytes;
use snapcheck::types::FileType;

fn entry(absolute: &str, normalized: &str, content: &str) -> FingerprintEntry {
    FingerprintEntry {
        absolute_path: absolute.to_string(),
        fingerprint: NormalizedFingerprint {
            normalized_path: normalized.to_string(),
            content_hash: hash_bytes(content.as_bytes()),
            file_type: FileType::RegularFile,
        },
    }
}

fn diff(
    strategy: FingerprintCompareStrategy,
    previous: &[FingerprintEntry],
    current: &[FingerprintEntry],
    options: CompareOptions,
) -> Vec<(ChangeKind, String)> {
    let mut visitor = CollectingVisitor::new();
    let completed = strategy.visit_changes_since(
        previous,
        current,
        "files",
        PropertyDirection::Input,
        options,
        &mut visitor,
    );
    assert!(completed);
    visitor
        .changes
        .into_iter()
        .map(|change| match change {
            TaskStateChange::File(file) => (file.kind, file.path),
            other => panic!("unexpected change {other:?}"),
        })
        .collect()
}

#[test]
fn unordered_reports_modified_added_and_removed() {
    let previous = vec![entry("/p/a", "a", "1"), entry("/p/b", "b", "1")];
    let current = vec![entry("/p/a", "a", "2"), entry("/p/c", "c", "1")];

    let changes = diff(
        FingerprintCompareStrategy::Unordered,
        &previous,
        &current,
        CompareOptions::ALL,
    );
    assert_eq!(
        changes,
        vec![
            (ChangeKind::Modified, "/p/a".to_string()),
            (ChangeKind::Added, "/p/c".to_string()),
            (ChangeKind::Removed, "/p/b".to_string()),
        ]
    );
}

#[test]
fn unordered_ignores_entry_order() {
    let previous = vec![entry("/p/a", "a", "1"), entry("/p/b", "b", "2")];
    let current = vec![entry("/p/b", "b", "2"), entry("/p/a", "a", "1")];

    assert!(diff(FingerprintCompareStrategy::Unordered, &previous, &current, CompareOptions::ALL).is_empty());
}

#[test]
fn unordered_matches_duplicate_normalized_paths_as_a_multiset() {
    // Two files share a name; only one of them changes.
    let previous = vec![entry("/p/x/a", "a", "1"), entry("/p/y/a", "a", "2")];
    let current = vec![entry("/p/x/a", "a", "1"), entry("/p/y/a", "a", "3")];

    let changes = diff(
        FingerprintCompareStrategy::Unordered,
        &previous,
        &current,
        CompareOptions::ALL,
    );
    assert_eq!(changes, vec![(ChangeKind::Modified, "/p/y/a".to_string())]);
}

#[test]
fn unordered_swapped_contents_under_one_name_is_no_change() {
    let previous = vec![entry("/p/x/a", "a", "1"), entry("/p/y/a", "a", "2")];
    let current = vec![entry("/p/x/a", "a", "2"), entry("/p/y/a", "a", "1")];

    assert!(diff(FingerprintCompareStrategy::Unordered, &previous, &current, CompareOptions::ALL).is_empty());
}

#[test]
fn ordered_reports_reorders_as_nothing() {
    let previous = vec![
        entry("/p/a", "a", "1"),
        entry("/p/b", "b", "2"),
        entry("/p/c", "c", "3"),
    ];
    let current = vec![
        entry("/p/c", "c", "3"),
        entry("/p/a", "a", "1"),
        entry("/p/b", "b", "2"),
    ];

    assert!(diff(FingerprintCompareStrategy::Ordered, &previous, &current, CompareOptions::ALL).is_empty());
}

#[test]
fn ordered_pairs_same_path_as_modification() {
    let previous = vec![entry("/p/a", "a", "1"), entry("/p/b", "b", "2")];
    let current = vec![
        entry("/p/a", "a", "1"),
        entry("/p/b", "b", "changed"),
        entry("/p/d", "d", "4"),
    ];

    let changes = diff(
        FingerprintCompareStrategy::Ordered,
        &previous,
        &current,
        CompareOptions::ALL,
    );
    assert_eq!(
        changes,
        vec![
            (ChangeKind::Modified, "/p/b".to_string()),
            (ChangeKind::Added, "/p/d".to_string()),
        ]
    );
}

#[test]
fn ordered_reports_removals() {
    let previous = vec![entry("/p/a", "a", "1"), entry("/p/b", "b", "2")];
    let current = vec![entry("/p/a", "a", "1")];

    let changes = diff(
        FingerprintCompareStrategy::Ordered,
        &previous,
        &current,
        CompareOptions::ALL,
    );
    assert_eq!(changes, vec![(ChangeKind::Removed, "/p/b".to_string())]);
}

#[test]
fn output_options_hide_additions_only() {
    let previous = vec![entry("/out/a", "/out/a", "1"), entry("/out/b", "/out/b", "1")];
    let current = vec![entry("/out/a", "/out/a", "1"), entry("/out/extra", "/out/extra", "1")];

    let changes = diff(
        FingerprintCompareStrategy::Unordered,
        &previous,
        &current,
        CompareOptions::OUTPUTS,
    );
    assert_eq!(changes, vec![(ChangeKind::Removed, "/out/b".to_string())]);
}

#[test]
fn visitor_can_stop_the_walk() {
    let previous = vec![entry("/p/a", "a", "1"), entry("/p/b", "b", "1")];
    let current = vec![entry("/p/a", "a", "2"), entry("/p/b", "b", "2")];

    let mut first = FirstChange::default();
    let completed = FingerprintCompareStrategy::Unordered.visit_changes_since(
        &previous,
        &current,
        "files",
        PropertyDirection::Input,
        CompareOptions::ALL,
        &mut first,
    );
    assert!(!completed);
    let message = first.change.map(|c| c.message());
    assert_eq!(
        message.as_deref(),
        Some("Input property 'files' file /p/a has changed.")
    );
}

//! End-to-end scenarios exercising the full pipeline: Markdown in,
//! committed files out.

use indoc::indoc;
use patchforge::block::{extract_blocks, Block};
use patchforge::commit::{commit_changes, ChangeAction, CommitMode, CommitOptions};
use patchforge::fuzzy::{fuzzy_patch_partial, patch_text, PatchInput};
use patchforge::plan::{apply_change_smartly, plan_changes};
use tempfile::tempdir;

#[test]
fn scenario_multi_hunk_modify_then_append() {
    let content = "a\nb\nc\n";
    let patch = "@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n@@ -3,1 +3,2 @@\n c\n+d\n";
    let out = patch_text(content, PatchInput::Diff(patch), 0.6).unwrap();
    assert_eq!(out, "a\nB\nc\nd\n");
}

#[test]
fn scenario_duplicate_anchor_deletion_prefers_nearest_hint() {
    let content = "x\nx\nx\n";
    let patch = "@@ -2,1 +1,0 @@\n-x\n";
    let out = patch_text(content, PatchInput::Diff(patch), 0.6).unwrap();
    assert_eq!(out.lines().count(), 2);
}

#[test]
fn scenario_anchor_bounded_conflict_markers() {
    let content = "START\ndrifted\nEND\n";
    let patch = "@@ -1,1 +1,1 @@\n START\n@@ -2,1 +2,1 @@\n-old middle\n+new middle\n@@ -3,1 +3,1 @@\n END\n";
    let (out, _applied, failed) = fuzzy_patch_partial(content, patch, 0.6);
    assert!(out.contains("<<<<<<< CURRENT (file content)"));
    assert!(out.contains("======="));
    assert!(out.contains(">>>>>>> PATCH (hunk #1)"));
    assert!(failed.is_empty() || failed.iter().all(|f| f.hunk_index != 1));
}

#[test]
fn scenario_multi_file_diff_commits_atomically_fail_fast() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "a1\n").unwrap();
    std::fs::write(dir.path().join("b.txt"), "b1\n").unwrap();

    let markdown = indoc! {r#"
        ```diff
        diff --git a/a.txt b/a.txt
        --- a/a.txt
        +++ b/a.txt
        @@ -1 +1 @@
        -a1
        +a2
        diff --git a/b.txt b/b.txt
        --- a/b.txt
        +++ b/b.txt
        @@ -1 +1 @@
        -b1
        +b2
        ```
    "#};

    let blocks = extract_blocks(markdown);
    assert_eq!(blocks.len(), 2);

    let planned = plan_changes(blocks, dir.path(), None);
    let mut changes = Vec::new();
    for plan in &planned {
        let (change, _logs) = apply_change_smartly(plan, dir.path(), None, None);
        changes.push(change.unwrap());
    }

    let summary = commit_changes(
        dir.path(),
        changes,
        CommitOptions { mode: CommitMode::FailFast, atomic: true, dry_run: false, backup_ext: None },
    );
    assert!(summary.failed.is_empty());
    assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "a2\n");
    assert_eq!(std::fs::read_to_string(dir.path().join("b.txt")).unwrap(), "b2\n");
}

#[test]
fn scenario_three_search_replace_blocks_in_one_fence() {
    let markdown = indoc! {r#"
        ```rust file=src/lib.rs
        <<<<<<< SEARCH
        fn one() {}
        =======
        fn one() { println!("1"); }
        >>>>>>> REPLACE
        <<<<<<< SEARCH
        fn two() {}
        =======
        fn two() { println!("2"); }
        >>>>>>> REPLACE
        <<<<<<< SEARCH
        fn three() {}
        =======
        fn three() { println!("3"); }
        >>>>>>> REPLACE
        ```
    "#};
    let blocks = extract_blocks(markdown);
    let search_replace_count = blocks.iter().filter(|b| matches!(b, Block::SearchReplace { .. })).count();
    assert_eq!(search_replace_count, 3);
}

#[test]
fn scenario_path_sandbox_rejects_traversal() {
    let dir = tempdir().unwrap();
    let markdown = "```rust file=../evil.txt\nfn pwned() {}\n```";
    let blocks = extract_blocks(markdown);
    let planned = plan_changes(blocks, dir.path(), None);
    let mut changes = Vec::new();
    for plan in &planned {
        let (change, _logs) = apply_change_smartly(plan, dir.path(), None, None);
        if let Some(c) = change {
            changes.push(c);
        }
    }
    let summary = commit_changes(dir.path(), changes, CommitOptions::new());
    assert_eq!(summary.failed, vec![std::path::PathBuf::from("../evil.txt")]);
    assert!(summary.errors[&std::path::PathBuf::from("../evil.txt")].contains("resolves outside"));
}

#[test]
fn rename_and_delete_blocks_are_forwarded_to_commit() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("old.rs"), "fn a() {}\n").unwrap();
    std::fs::write(dir.path().join("gone.rs"), "fn b() {}\n").unwrap();

    let markdown = indoc! {r#"
        ```diff
        diff --git a/old.rs b/new.rs
        rename from old.rs
        rename to new.rs
        ```
        ```diff
        --- a/gone.rs
        +++ /dev/null
        @@ -1 +0,0 @@
        -fn b() {}
        ```
    "#};
    let blocks = extract_blocks(markdown);
    let planned = plan_changes(blocks, dir.path(), None);
    assert_eq!(planned.len(), 2);

    let mut changes = Vec::new();
    for plan in &planned {
        let (change, _logs) = apply_change_smartly(plan, dir.path(), None, None);
        changes.push(change.unwrap());
    }
    assert!(changes.iter().any(|c| c.action == ChangeAction::Rename));
    assert!(changes.iter().any(|c| c.action == ChangeAction::Delete));

    let summary = commit_changes(dir.path(), changes, CommitOptions::new());
    assert!(summary.failed.is_empty(), "{:?}", summary.errors);
    assert!(dir.path().join("new.rs").exists());
    assert!(!dir.path().join("old.rs").exists());
    assert!(!dir.path().join("gone.rs").exists());
}

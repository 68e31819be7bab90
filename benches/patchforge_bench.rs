use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indoc::indoc;
use patchforge::block::extract_blocks;
use patchforge::fuzzy::{patch_text, PatchInput};

// --- Extraction Benchmarks ---

fn extraction_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Extraction");

    let simple_diff = indoc! {r#"
        A markdown file with some text.
        ```diff
        --- a/src/main.rs
        +++ b/src/main.rs
        @@ -1,3 +1,3 @@
         fn main() {
        -    println!("Hello, world!");
        +    println!("Hello, patchforge!");
         }
        ```
    "#};
    group.bench_function("simple_diff", |b| {
        b.iter(|| extract_blocks(black_box(simple_diff)));
    });

    let multi_file_diff = indoc! {r#"
        ```diff
        diff --git a/file1.txt b/file1.txt
        --- a/file1.txt
        +++ b/file1.txt
        @@ -1 +1 @@
        -foo
        +bar
        diff --git a/file2.txt b/file2.txt
        --- a/file2.txt
        +++ b/file2.txt
        @@ -1 +1 @@
        -baz
        +qux
        ```
    "#};
    group.bench_function("multi_file_diff", |b| {
        b.iter(|| extract_blocks(black_box(multi_file_diff)));
    });

    // Large markdown file with one diff block at the end, to test how fast
    // the fence tokenizer scans past unrelated prose.
    let mut large_markdown = "Lorem ipsum dolor sit amet...\n".repeat(1000);
    large_markdown.push_str(simple_diff);
    group.bench_function("large_markdown_scan", |b| {
        b.iter(|| extract_blocks(black_box(&large_markdown)));
    });

    group.finish();
}

// --- Fuzzy Patch Engine Benchmarks ---

fn patching_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Patching");

    // --- Exact match on a large file ---
    let mut large_file_content = String::new();
    for i in 0..10000 {
        large_file_content.push_str(&format!("This is line number {}\n", i));
    }
    let exact_patch = indoc! {"
        @@ -5000,5 +5000,5 @@
         This is line number 4999
         This is line number 5000
        -This is line number 5001
        +THIS LINE WAS CHANGED
         This is line number 5002
         This is line number 5003
    "};
    group.bench_function("exact_match_large_file", |b| {
        b.iter(|| {
            patch_text(black_box(&large_file_content), PatchInput::Diff(black_box(exact_patch)), 0.6)
        });
    });

    // --- Fuzzy match on a large file with the anchor still intact ---
    let mut drifted_content = large_file_content.clone();
    drifted_content.insert_str(100, "An extra line to break exact matching\n");
    group.bench_function("fuzzy_match_large_file_with_anchor", |b| {
        b.iter(|| patch_text(black_box(&drifted_content), PatchInput::Diff(black_box(exact_patch)), 0.6));
    });

    // --- Fuzzy match worst case: no anchor survives, full windowed scan ---
    let repetitive_content = "println!(\"hello world\");\n".repeat(10000);
    let worst_case_patch = indoc! {r#"
        @@ -5000,3 +5000,3 @@
         println!("hello world");
        -println!("this line does not exist");
        +println!("neither does this one");
         println!("hello world");
    "#};
    group.bench_function("fuzzy_match_worst_case_no_anchor", |b| {
        // Expected to fall through to conflict-marker synthesis; we are
        // measuring the time spent searching, not a successful match.
        b.iter(|| {
            let _ = patch_text(black_box(&repetitive_content), PatchInput::Diff(black_box(worst_case_patch)), 0.6);
        });
    });

    // --- Ambiguous exact match resolved by line-number hint ---
    let ambiguous_content = indoc! {"
        // Block 1
        fn duplicate() {
            println!(\"hello\");
        }
        // ...
        // Block 2
        fn duplicate() {
            println!(\"hello\");
        }
    "}
    .repeat(100);
    let ambiguous_patch = indoc! {r#"
        @@ -7,3 +7,3 @@
         fn duplicate() {
        -    println!("hello");
        +    println!("world");
         }
    "#};
    group.bench_function("ambiguous_exact_match_resolved_by_hint", |b| {
        b.iter(|| {
            patch_text(black_box(&ambiguous_content), PatchInput::Diff(black_box(ambiguous_patch)), 0.6)
        });
    });

    group.finish();
}

criterion_group!(benches, extraction_benches, patching_benches);
criterion_main!(benches);

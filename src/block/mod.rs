//! Block Extractor: turns freeform Markdown into an ordered list of
//! structured [`Block`]s.

pub mod fence;
pub mod special;

use std::collections::HashMap;

use fence::FenceBlock;
use log::debug;

/// A single structured edit extracted from Markdown.
#[derive(Debug, Clone)]
pub enum Block {
    /// A full-file replacement (or creation).
    File {
        file_path: Option<String>,
        language: String,
        code: String,
        start: usize,
        end: usize,
        context: String,
    },
    /// A unified or simplified diff targeting one file.
    Diff {
        file_path: Option<String>,
        code: String,
        start: usize,
        end: usize,
        context: String,
    },
    /// A file rename (optionally carrying content changes, which are not
    /// modeled here — renames are forwarded to the planner as-is).
    Rename {
        from_path: String,
        to_path: String,
        start: usize,
        end: usize,
    },
    /// A file deletion.
    Delete {
        file_path: String,
        start: usize,
        end: usize,
    },
    /// An atomic search/replace pair within one file.
    SearchReplace {
        file_path: String,
        old_content: String,
        new_content: String,
        language: String,
        start: usize,
        end: usize,
    },
}

impl Block {
    pub fn start(&self) -> usize {
        match self {
            Block::File { start, .. }
            | Block::Diff { start, .. }
            | Block::Rename { start, .. }
            | Block::Delete { start, .. }
            | Block::SearchReplace { start, .. } => *start,
        }
    }

    pub fn file_path(&self) -> Option<&str> {
        match self {
            Block::File { file_path, .. } | Block::Diff { file_path, .. } => file_path.as_deref(),
            Block::Rename { to_path, .. } => Some(to_path),
            Block::Delete { file_path, .. } => Some(file_path),
            Block::SearchReplace { file_path, .. } => Some(file_path),
        }
    }

    /// The dedup key's type tag. `SearchReplace` never shares a key with
    /// anything (each tuple stays independent), which we model by giving
    /// it no stable key at all.
    fn dedup_kind(&self) -> Option<&'static str> {
        match self {
            Block::File { .. } => Some("file"),
            Block::Diff { .. } => Some("diff"),
            _ => None,
        }
    }
}

/// Extracts every edit block from `markdown`, in source order, after
/// deduplicating competing full-file/diff blocks for the same path.
///
/// Unknown or malformed fenced blocks are skipped and logged at `debug`
/// level rather than raising — extraction is tolerant by design; only the
/// downstream fuzzy patch engine is strict.
pub fn extract_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();

    for fence_block in fence::extract_all_blocks_from_text(markdown) {
        blocks.extend(classify_fence_block(&fence_block));
    }
    blocks.extend(special::extract_custom_patch_envelope_blocks(markdown));

    if blocks.is_empty() && looks_like_bare_diff(markdown) {
        debug!("no fenced blocks found; treating whole input as a single diff");
        blocks.push(Block::Diff {
            file_path: None,
            code: markdown.to_string(),
            start: 0,
            end: markdown.len(),
            context: String::new(),
        });
    }

    dedup_and_sort(blocks)
}

fn classify_fence_block(fb: &FenceBlock) -> Vec<Block> {
    if let Some(from) = &fb.rename_from_attr {
        if let Some(to) = &fb.rename_to_attr {
            return vec![Block::Rename {
                from_path: from.clone(),
                to_path: to.clone(),
                start: fb.start,
                end: fb.end,
            }];
        }
    }

    if special::contains_search_replace_markers(&fb.code) {
        if let Some(path) = &fb.file_path_attr {
            return special::extract_search_replace_blocks(fb, path);
        }
        debug!("SEARCH/REPLACE block with no resolvable file path was skipped");
        return vec![];
    }

    if let Some(block) = special::detect_rename_or_delete(fb) {
        return vec![block];
    }

    let is_diff_labelled = matches!(fb.language.as_str(), "diff" | "patch");
    let looks_like_diff = looks_like_bare_diff(&fb.code);

    if is_diff_labelled && !looks_like_diff {
        debug!("block labelled `{}` was not recognizable as a diff; skipping", fb.language);
        return vec![];
    }

    if looks_like_diff {
        return special::split_multi_file_diff(&fb.code)
            .into_iter()
            .map(|(path, body)| Block::Diff {
                file_path: path.or_else(|| fb.file_path_attr.clone()),
                code: body,
                start: fb.start,
                end: fb.end,
                context: fb.context.clone(),
            })
            .collect();
    }

    vec![Block::File {
        file_path: fb.file_path_attr.clone(),
        language: fb.language.clone(),
        code: fb.code.clone(),
        start: fb.start,
        end: fb.end,
        context: fb.context.clone(),
    }]
}

fn looks_like_bare_diff(code: &str) -> bool {
    code.contains("\n@@ -")
        || code.starts_with("@@ -")
        || code.contains("\ndiff --git ")
        || code.starts_with("diff --git ")
        || (code.contains("\n--- ") && code.contains("\n+++ "))
}

/// Groups `(file_path, dedup_kind)` and keeps only the highest-`start`
/// block for `File`/`Diff`; everything else (including every
/// `SearchReplace`) survives untouched. The result is sorted by `start`.
fn dedup_and_sort(blocks: Vec<Block>) -> Vec<Block> {
    let mut keep: Vec<Block> = Vec::with_capacity(blocks.len());
    let mut best_for_key: HashMap<(String, &'static str), usize> = HashMap::new();

    for block in blocks {
        match (block.file_path(), block.dedup_kind()) {
            (Some(path), Some(kind)) => {
                let key = (path.to_string(), kind);
                match best_for_key.get(&key) {
                    Some(&existing_idx) if keep[existing_idx].start() >= block.start() => {
                        debug!("dropping superseded {kind} block for {path}");
                    }
                    _ => {
                        if let Some(&existing_idx) = best_for_key.get(&key) {
                            keep[existing_idx] = block;
                            best_for_key.insert(key, existing_idx);
                        } else {
                            best_for_key.insert(key, keep.len());
                            keep.push(block);
                        }
                    }
                }
            }
            _ => keep.push(block),
        }
    }

    keep.sort_by_key(|b| b.start());
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_file_block() {
        let md = "```rust file=src/main.rs\nfn main() {}\n```";
        let blocks = extract_blocks(md);
        assert_eq!(blocks.len(), 1);
        assert!(matches!(&blocks[0], Block::File { file_path, .. } if file_path.as_deref() == Some("src/main.rs")));
    }

    #[test]
    fn dedups_same_path_file_blocks_keeping_last() {
        let md = "```rust file=src/main.rs\nfn old() {}\n```\nSome text\n```rust file=src/main.rs\nfn new() {}\n```";
        let blocks = extract_blocks(md);
        assert_eq!(blocks.len(), 1);
        assert!(matches!(&blocks[0], Block::File { code, .. } if code.contains("new")));
    }

    #[test]
    fn never_dedups_search_replace() {
        let md = "```rust file=src/main.rs\n<<<<<<< SEARCH\na\n=======\nb\n>>>>>>> REPLACE\n<<<<<<< SEARCH\nc\n=======\nd\n>>>>>>> REPLACE\n```";
        let blocks = extract_blocks(md);
        assert_eq!(blocks.len(), 2);
    }

    #[test]
    fn falls_back_to_bare_diff() {
        let md = "--- a/f.txt\n+++ b/f.txt\n@@ -1 +1 @@\n-old\n+new\n";
        let blocks = extract_blocks(md);
        assert_eq!(blocks.len(), 1);
        assert!(matches!(&blocks[0], Block::Diff { .. }));
    }
}

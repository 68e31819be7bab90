//! Recognizers for the non-generic block shapes: SEARCH/REPLACE tuples,
//! the `*** Begin Patch` envelope, and rename/delete diffs.

use regex::Regex;
use std::sync::OnceLock;

use super::Block;
use crate::block::fence::FenceBlock;

fn search_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^<{4,7}\s*SEARCH\s*$\n(?P<old>(?:.*\n)*?)^={4,7}\s*$\n(?P<new>(?:.*\n)*?)^>{4,7}\s*REPLACE\s*$\n?")
            .unwrap()
    })
}

fn chevron_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^<{4}\s*$\n(?P<old>(?:.*\n)*?)^={4}\s*$\n(?P<new>(?:.*\n)*?)^>{4}\s*$\n?").unwrap()
    })
}

/// Extracts every SEARCH/REPLACE (or chevron-delimited) tuple from a
/// fenced block's body. Each tuple becomes its own [`Block::SearchReplace`]
/// — these are intentionally never deduplicated, since a single file edit
/// often carries several independent search/replace pairs.
pub fn extract_search_replace_blocks(fence: &FenceBlock, file_path: &str) -> Vec<Block> {
    let mut out = Vec::new();
    let re = if search_marker_re().is_match(&fence.code) {
        search_marker_re()
    } else {
        chevron_marker_re()
    };
    for caps in re.captures_iter(&fence.code) {
        let old = caps.name("old").map(|m| m.as_str()).unwrap_or_default();
        let new = caps.name("new").map(|m| m.as_str()).unwrap_or_default();
        out.push(Block::SearchReplace {
            file_path: file_path.to_string(),
            old_content: strip_trailing_added_newline(old),
            new_content: strip_trailing_added_newline(new),
            language: fence.language.clone(),
            start: fence.start,
            end: fence.end,
        });
    }
    out
}

fn strip_trailing_added_newline(s: &str) -> String {
    s.strip_suffix('\n').unwrap_or(s).to_string()
}

pub fn contains_search_replace_markers(code: &str) -> bool {
    search_marker_re().is_match(code) || chevron_marker_re().is_match(code)
}

fn diff_git_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^diff --git a/(?P<a>\S+) b/(?P<b>\S+)").unwrap())
}

fn plus_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\+\+\+ (?:b/)?(?P<p>\S+)").unwrap())
}

fn minus_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^--- (?:a/)?(?P<p>\S+)").unwrap())
}

fn rename_from_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^rename from (?P<p>.+)$").unwrap())
}

fn rename_to_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^rename to (?P<p>.+)$").unwrap())
}

/// If `code` is a diff whose whole purpose is a rename or a delete (no
/// other line-level content worth running through the fuzzy patch engine),
/// returns the corresponding [`Block::Rename`] or [`Block::Delete`].
pub fn detect_rename_or_delete(fence: &FenceBlock) -> Option<Block> {
    let code = &fence.code;
    if let (Some(from), Some(to)) = (rename_from_re().captures(code), rename_to_re().captures(code)) {
        return Some(Block::Rename {
            from_path: from["p"].trim().to_string(),
            to_path: to["p"].trim().to_string(),
            start: fence.start,
            end: fence.end,
        });
    }

    let is_delete_marker = code.contains("+++ /dev/null")
        || code.contains("deleted file mode")
        || code.contains("*** Delete File:");

    if is_delete_marker {
        let path = minus_header_re()
            .captures(code)
            .map(|c| c["p"].to_string())
            .or_else(|| diff_git_re().captures(code).map(|c| c["a"].to_string()))
            .or_else(|| {
                Regex::new(r"(?m)^\*\*\* Delete File:\s*(?P<p>.+)$")
                    .unwrap()
                    .captures(code)
                    .map(|c| c["p"].trim().to_string())
            });
        if let Some(path) = path {
            if path != "/dev/null" {
                return Some(Block::Delete {
                    file_path: path,
                    start: fence.start,
                    end: fence.end,
                });
            }
        }
    }

    None
}

/// Splits a diff body containing multiple `diff --git`/`--- a/` sections
/// into one `(path, body)` pair per file. Single-file diffs come back as a
/// single-element vector.
pub fn split_multi_file_diff(code: &str) -> Vec<(Option<String>, String)> {
    let mut boundaries: Vec<usize> = diff_git_re()
        .find_iter(code)
        .map(|m| m.start())
        .collect();
    if boundaries.is_empty() {
        boundaries = minus_header_re().find_iter(code).map(|m| m.start()).collect();
    }
    if boundaries.len() <= 1 {
        return vec![(file_path_for_section(code), code.to_string())];
    }
    let mut out = Vec::new();
    for (i, &start) in boundaries.iter().enumerate() {
        let end = boundaries.get(i + 1).copied().unwrap_or(code.len());
        let section = &code[start..end];
        out.push((file_path_for_section(section), section.to_string()));
    }
    out
}

fn file_path_for_section(section: &str) -> Option<String> {
    plus_header_re()
        .captures(section)
        .map(|c| c["p"].to_string())
        .filter(|p| p != "/dev/null")
        .or_else(|| diff_git_re().captures(section).map(|c| c["b"].to_string()))
}

/// Parses `*** Begin Patch` / `*** End Patch` envelopes, each containing
/// one or more `*** [Add|Update|Delete] File: <path>` sections whose
/// bodies are diff content.
pub fn extract_custom_patch_envelope_blocks(markdown: &str) -> Vec<Block> {
    let envelope_re = Regex::new(r"(?s)\*\*\* Begin Patch\n(.*?)\n\*\*\* End Patch").unwrap();
    let file_header_re =
        Regex::new(r"(?m)^\*\*\* (?:Add|Update|Delete) File:\s*(?P<p>.+)$").unwrap();

    let mut out = Vec::new();
    for envelope in envelope_re.captures_iter(markdown) {
        let body = &envelope[1];
        let headers: Vec<_> = file_header_re.captures_iter(body).collect();
        let positions: Vec<usize> = file_header_re.find_iter(body).map(|m| m.start()).collect();
        for (i, header) in headers.iter().enumerate() {
            let path = header["p"].trim().to_string();
            let start = positions[i];
            let end = positions.get(i + 1).copied().unwrap_or(body.len());
            let section = &body[start..end];
            if header.get(0).unwrap().as_str().contains("Delete File") {
                out.push(Block::Delete {
                    file_path: path,
                    start: 0,
                    end: 0,
                });
            } else {
                out.push(Block::Diff {
                    file_path: Some(path),
                    code: section.to_string(),
                    start: 0,
                    end: 0,
                    context: String::new(),
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::fence::FenceBlock;

    fn fence(code: &str) -> FenceBlock {
        FenceBlock {
            language: "diff".into(),
            code: code.to_string(),
            file_path_attr: None,
            rename_from_attr: None,
            rename_to_attr: None,
            start: 0,
            end: code.len(),
            context: String::new(),
        }
    }

    #[test]
    fn extracts_one_search_replace_tuple() {
        let code = "<<<<<<< SEARCH\nold line\n=======\nnew line\n>>>>>>> REPLACE\n";
        let f = fence(code);
        let blocks = extract_search_replace_blocks(&f, "src/main.rs");
        assert_eq!(blocks.len(), 1);
        match &blocks[0] {
            Block::SearchReplace { old_content, new_content, .. } => {
                assert_eq!(old_content, "old line");
                assert_eq!(new_content, "new line");
            }
            _ => panic!("expected SearchReplace"),
        }
    }

    #[test]
    fn detects_delete_diff() {
        let code = "--- a/old.txt\n+++ /dev/null\n@@ -1 +0,0 @@\n-gone\n";
        let f = fence(code);
        match detect_rename_or_delete(&f) {
            Some(Block::Delete { file_path, .. }) => assert_eq!(file_path, "old.txt"),
            other => panic!("expected Delete, got {other:?}"),
        }
    }

    #[test]
    fn detects_rename_diff() {
        let code = "diff --git a/old.rs b/new.rs\nrename from old.rs\nrename to new.rs\n";
        let f = fence(code);
        match detect_rename_or_delete(&f) {
            Some(Block::Rename { from_path, to_path, .. }) => {
                assert_eq!(from_path, "old.rs");
                assert_eq!(to_path, "new.rs");
            }
            other => panic!("expected Rename, got {other:?}"),
        }
    }

    #[test]
    fn splits_multi_file_diff() {
        let code = "diff --git a/a.rs b/a.rs\n--- a/a.rs\n+++ b/a.rs\n@@ -1 +1 @@\n-x\n+y\ndiff --git a/b.rs b/b.rs\n--- a/b.rs\n+++ b/b.rs\n@@ -1 +1 @@\n-p\n+q\n";
        let sections = split_multi_file_diff(code);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0.as_deref(), Some("a.rs"));
        assert_eq!(sections[1].0.as_deref(), Some("b.rs"));
    }
}

//! Metadata Classifier: given a block's surrounding prose and its code
//! body, decides the target file path and whether the body is a diff or
//! a full-file replacement.
//!
//! This mirrors the rule ordering the Block Extractor already applies
//! inline, but is exposed standalone so callers can classify a block
//! whose path or type wasn't resolved during extraction (the
//! `classifier_callback` hook on [`crate::plan::plan_changes`]).

use regex::Regex;
use std::sync::OnceLock;

/// What a block's body represents, once classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Diff,
    FullReplacement,
}

/// The resolved path and type for a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMetadata {
    pub file_path: String,
    pub change_type: ChangeType,
}

fn diff_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^(?:\+\+\+ (?:b/)?(?P<plus>\S+)|--- (?:a/)?(?P<minus>\S+)|diff --git a/\S+ b/(?P<git>\S+)|Index: (?P<idx>\S+))")
            .unwrap()
    })
}

fn hunk_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^@@ ").unwrap())
}

fn truncation_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)(^\s*#\s*\.\.\.|^\s*//\s*\.\.\.|<!--\s*\.\.\.\s*-->|/\*\s*\.\.\.\s*\*/|^\s*--\s*\.\.\.)").unwrap()
    })
}

fn structural_cue_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^\s*(import |class |def |function |<!DOCTYPE)|^\s*\{").unwrap()
    })
}

const LABELLED_PATH: &str = r#"(?i)\b(?:new|create(?:d)?|add(?:ed)?|write|save|file(?:name)?|filepath|path)\b\s*:?\s*["'`]*(?P<path>(?:\.?/)?(?:[\w.\-]+/)+[\w.\-]+\.[A-Za-z0-9]{1,8}|[\w.\-]+\.[A-Za-z0-9]{1,8})"#;

fn labelled_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LABELLED_PATH).unwrap())
}

/// Classifies a block from its preceding prose (`context`), its body
/// (`code`), and the fence's declared language, following the priority
/// order: diff headers in the body (highest priority, overrides any path
/// found in context) > hunk markers > path hints in context, with
/// full-file-vs-diff decided by truncation markers or structural cues.
pub fn extract_file_info_from_context_and_code(
    context: &str,
    code: &str,
    _language: &str,
) -> Option<BlockMetadata> {
    if let Some(caps) = diff_header_re().captures(code) {
        let path = caps
            .name("plus")
            .or_else(|| caps.name("minus"))
            .or_else(|| caps.name("git"))
            .or_else(|| caps.name("idx"))
            .map(|m| m.as_str())
            .filter(|p| *p != "/dev/null")?;
        return Some(BlockMetadata {
            file_path: path.to_string(),
            change_type: ChangeType::Diff,
        });
    }

    let path_from_context = labelled_path_re()
        .captures(context)
        .map(|c| c["path"].replace('\\', "/"));

    if hunk_marker_re().is_match(code) {
        return path_from_context.map(|path| BlockMetadata {
            file_path: path,
            change_type: ChangeType::Diff,
        });
    }

    let path = path_from_context?;
    let change_type = if truncation_marker_re().is_match(code) || structural_cue_re().is_match(code) {
        ChangeType::Diff
    } else {
        ChangeType::FullReplacement
    };
    Some(BlockMetadata { file_path: path, change_type })
}

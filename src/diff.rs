//! Diff Parser: turns a diff body into a sequence of [`Hunk`]s, accepting
//! either the standard unified dialect (`@@ -l,s +l,s @@`) or a simplified
//! dialect that separates hunks with a bare `@@` and carries no line
//! numbers.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ParseError;

/// One hunk of a diff: a contiguous run of context/addition/deletion
/// lines, plus the line numbers from its header (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    /// Each line prefixed with `' '` (context), `'+'` (addition), or
    /// `'-'` (deletion); the prefix is stripped from the stored string.
    pub lines: Vec<HunkLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Add,
    Del,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLine {
    pub kind: LineKind,
    pub text: String,
}

impl Hunk {
    /// Lines present in the "old" side: context + deletions.
    pub fn old_content(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.kind != LineKind::Add)
            .map(|l| l.text.as_str())
            .collect()
    }

    /// Lines present in the "new" side: context + additions.
    pub fn new_content(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|l| l.kind != LineKind::Del)
            .map(|l| l.text.as_str())
            .collect()
    }

    /// Leading run of context lines (possibly empty).
    pub fn lead_ctx(&self) -> Vec<&str> {
        self.lines
            .iter()
            .take_while(|l| l.kind == LineKind::Context)
            .map(|l| l.text.as_str())
            .collect()
    }

    /// Trailing run of context lines (possibly empty, possibly
    /// overlapping `lead_ctx` for an all-context hunk).
    pub fn tail_ctx(&self) -> Vec<&str> {
        self.lines
            .iter()
            .rev()
            .take_while(|l| l.kind == LineKind::Context)
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    pub fn is_pure_addition(&self) -> bool {
        self.lines.iter().any(|l| l.kind == LineKind::Add)
            && !self.lines.iter().any(|l| l.kind == LineKind::Del)
    }
}

fn unified_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").unwrap())
}

fn classify_line(line: &str) -> Option<HunkLine> {
    if let Some(rest) = line.strip_prefix('+') {
        Some(HunkLine { kind: LineKind::Add, text: rest.to_string() })
    } else if let Some(rest) = line.strip_prefix('-') {
        Some(HunkLine { kind: LineKind::Del, text: rest.to_string() })
    } else if let Some(rest) = line.strip_prefix(' ') {
        Some(HunkLine { kind: LineKind::Context, text: rest.to_string() })
    } else if line.is_empty() {
        Some(HunkLine { kind: LineKind::Context, text: String::new() })
    } else if line.starts_with("\\ No newline") || line.starts_with("diff --git") || line.starts_with("index ")
        || line.starts_with("--- ") || line.starts_with("+++ ") || line.starts_with("rename ")
        || line.starts_with("deleted file") || line.starts_with("new file")
    {
        None
    } else {
        // A line with no recognized prefix inside a hunk body is treated
        // as context; real-world diffs from language models routinely
        // drop the leading space on unmodified lines.
        Some(HunkLine { kind: LineKind::Context, text: line.to_string() })
    }
}

/// Parses a standard unified-diff body into its hunks.
pub fn parse_unified(code: &str) -> Result<Vec<Hunk>, ParseError> {
    let mut hunks = Vec::new();
    let mut lines = code.lines().peekable();
    while let Some(line) = lines.next() {
        let Some(caps) = unified_header_re().captures(line) else { continue };
        let old_start: usize = caps[1].parse().unwrap_or(1);
        let old_len: usize = caps.get(2).map_or(1, |m| m.as_str().parse().unwrap_or(1));
        let new_start: usize = caps[3].parse().unwrap_or(1);
        let new_len: usize = caps.get(4).map_or(1, |m| m.as_str().parse().unwrap_or(1));

        let mut body = Vec::new();
        while let Some(&next) = lines.peek() {
            if unified_header_re().is_match(next) {
                break;
            }
            if next.starts_with("--- ") || next.starts_with("+++ ") {
                break;
            }
            if let Some(hl) = classify_line(next) {
                body.push(hl);
            }
            lines.next();
        }
        hunks.push(Hunk { old_start, old_len, new_start, new_len, lines: body });
    }

    if hunks.is_empty() {
        Err(ParseError::NoHunks)
    } else {
        Ok(hunks)
    }
}

/// Parses the simplified dialect: hunks separated by a bare `@@` line,
/// no embedded line numbers. `old_start`/`new_start` default to 1 for the
/// first hunk; subsequent hunks get a start hint computed by the fuzzy
/// patch engine instead (see [`crate::fuzzy`]), so the parser just leaves
/// them at 1 here.
pub fn parse_simplified(code: &str) -> Result<Vec<Hunk>, ParseError> {
    let mut hunks = Vec::new();
    let mut current: Vec<HunkLine> = Vec::new();
    let mut started = false;

    for line in code.lines() {
        let trimmed = line.trim();
        if trimmed == "@@" {
            if started && !current.is_empty() {
                hunks.push(make_simplified_hunk(std::mem::take(&mut current)));
            }
            started = true;
            continue;
        }
        if !started {
            // preamble before the first hunk marker; discarded unless the
            // body starts immediately with +/- lines (no leading `@@`).
            if line.starts_with('+') || line.starts_with('-') || line.starts_with(' ') {
                started = true;
            } else {
                continue;
            }
        }
        if line.starts_with("--- ") || line.starts_with("+++ ") {
            continue;
        }
        if let Some(hl) = classify_line(line) {
            current.push(hl);
        }
    }
    if started && !current.is_empty() {
        hunks.push(make_simplified_hunk(current));
    }

    if hunks.is_empty() {
        Err(ParseError::NoHunks)
    } else {
        Ok(hunks)
    }
}

fn make_simplified_hunk(lines: Vec<HunkLine>) -> Hunk {
    let old_len = lines.iter().filter(|l| l.kind != LineKind::Add).count();
    let new_len = lines.iter().filter(|l| l.kind != LineKind::Del).count();
    Hunk { old_start: 1, old_len, new_start: 1, new_len, lines }
}

/// Chooses a dialect based on whether any line matches the numbered
/// unified header, and parses accordingly.
pub fn parse_auto(code: &str) -> Result<Vec<Hunk>, ParseError> {
    if is_unified_dialect(code) {
        parse_unified(code)
    } else {
        parse_simplified(code)
    }
}

/// True if `code` carries at least one numbered `@@ -l,s +l,s @@` header,
/// i.e. it is the standard unified dialect rather than the simplified
/// bare-`@@` one.
pub fn is_unified_dialect(code: &str) -> bool {
    code.lines().any(|l| unified_header_re().is_match(l))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_unified_hunk() {
        let code = "--- a/f\n+++ b/f\n@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n";
        let hunks = parse_unified(code).unwrap();
        assert_eq!(hunks.len(), 1);
        let h = &hunks[0];
        assert_eq!(h.old_start, 1);
        assert_eq!(h.new_start, 1);
        assert_eq!(h.old_content(), vec!["a", "b", "c"]);
        assert_eq!(h.new_content(), vec!["a", "B", "c"]);
    }

    #[test]
    fn parses_simplified_dialect() {
        let code = "@@\n a\n-b\n+B\n c\n@@\n x\n+y\n";
        let hunks = parse_simplified(code).unwrap();
        assert_eq!(hunks.len(), 2);
        assert!(hunks[1].is_pure_addition());
    }

    #[test]
    fn empty_input_is_error() {
        assert!(matches!(parse_unified(""), Err(ParseError::NoHunks)));
    }

    #[test]
    fn lead_and_tail_context() {
        let code = "@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n";
        let hunks = parse_unified(code).unwrap();
        assert_eq!(hunks[0].lead_ctx(), vec!["a"]);
        assert_eq!(hunks[0].tail_ctx(), vec!["c"]);
    }
}

//! Stack-based fence tokenizer.
//!
//! Finds top-level fenced code blocks in Markdown, correctly handling
//! nested fences, same-line closers (`` }``` ``), long fences, and
//! fence-like sequences that appear mid-line (which can only ever be
//! closers, never openers — this is what keeps fence characters embedded
//! in string literals from being mistaken for a new block).

use regex::Regex;
use std::sync::OnceLock;

/// A single top-level fenced block, with its info-string already split
/// into language and any `file=`/`from=`/`to=` attributes.
#[derive(Debug, Clone)]
pub struct FenceBlock {
    pub language: String,
    pub code: String,
    pub file_path_attr: Option<String>,
    pub rename_from_attr: Option<String>,
    pub rename_to_attr: Option<String>,
    pub start: usize,
    pub end: usize,
    pub context: String,
}

fn opener_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*(`{3,}|~{3,})([^\n\r]*)").unwrap())
}

fn any_fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(`{3,}|~{3,})").unwrap())
}

fn same_line_closer_opener_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([`~]{3,})[ \t]*([`~]{3,}[^\n\r]+)").unwrap())
}

/// Splits a closer immediately followed by an opener on the same line
/// (`` ``````diff ``) into two lines, so the stack-based scan below never
/// has to special-case it.
fn preprocess_fences(markdown: &str) -> String {
    same_line_closer_opener_re()
        .replace_all(markdown, "$1\n$2")
        .into_owned()
}

fn context_before(text: &str, idx: usize, lines: usize) -> String {
    let snippet = &text[..idx];
    let all: Vec<&str> = snippet.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].join("\n")
}

/// Extracts every top-level fenced block from `markdown`.
pub fn extract_all_blocks_from_text(markdown: &str) -> Vec<FenceBlock> {
    let text = preprocess_fences(markdown);
    let mut blocks = Vec::new();
    let mut cursor = 0usize;

    while cursor < text.len() {
        let Some(m) = opener_re().find_at(&text, cursor) else {
            break;
        };
        let caps = opener_re().captures(&text[m.start()..]).unwrap();
        let opener_fence = caps.get(1).unwrap().as_str();
        let opener_char = opener_fence.as_bytes()[0];
        let opener_len = opener_fence.len();
        let info_string = caps.get(2).map(|g| g.as_str().trim()).unwrap_or("");

        let opener_end = m.end();
        let mut content_start = opener_end;
        if text[content_start..].starts_with("\r\n") {
            content_start += 2;
        } else if text[content_start..].starts_with('\n') {
            content_start += 1;
        }

        let mut stack: Vec<(u8, usize)> = vec![(opener_char, opener_len)];
        let mut content_end: Option<usize> = None;
        let mut next_search_start = opener_end;
        let mut scan_pos = content_start;

        while scan_pos < text.len() {
            let Some(candidate) = any_fence_re().find_at(&text, scan_pos) else {
                break;
            };
            let candidate_fence = candidate.as_str();
            let candidate_char = candidate_fence.as_bytes()[0];
            let candidate_len = candidate_fence.len();

            let line_end = text[candidate.end()..]
                .find('\n')
                .map(|i| candidate.end() + i)
                .unwrap_or(text.len());
            let info_on_same_line = text[candidate.end()..line_end].trim();

            let line_start = text[..candidate.start()]
                .rfind('\n')
                .map(|i| i + 1)
                .unwrap_or(0);
            let is_at_line_start = text[line_start..candidate.start()].trim().is_empty();

            if is_at_line_start {
                if !info_on_same_line.is_empty() {
                    stack.push((candidate_char, candidate_len));
                } else if let Some(&(top_char, top_len)) = stack.last() {
                    if candidate_char == top_char && candidate_len >= top_len {
                        stack.pop();
                    }
                }
            } else if !info_on_same_line.is_empty() {
                // mid-line with trailing info can never close or open.
            } else if let Some(&(top_char, top_len)) = stack.last() {
                if candidate_char == top_char && candidate_len >= top_len {
                    stack.pop();
                }
            }

            if stack.is_empty() {
                content_end = Some(candidate.start());
                next_search_start = candidate.end();
                break;
            }
            scan_pos = candidate.end();
        }

        if let Some(end) = content_end {
            let code = dedent(&text[content_start..end]);
            let (lang, file_attr, from_attr, to_attr) = parse_info_string(info_string);
            let file_path_attr = file_attr.or_else(|| {
                let ctx = context_before(&text, m.start(), 2);
                extract_path_hint_from_lines(&ctx)
            });
            blocks.push(FenceBlock {
                language: if lang.is_empty() { "plain".to_string() } else { lang },
                code,
                file_path_attr,
                rename_from_attr: from_attr,
                rename_to_attr: to_attr,
                start: content_start,
                end,
                context: context_before(&text, m.start(), 5),
            });
        }

        cursor = next_search_start;
    }

    blocks
}

fn parse_info_string(info: &str) -> (String, Option<String>, Option<String>, Option<String>) {
    let parts: Vec<&str> = info.split_whitespace().collect();
    let lang = parts
        .first()
        .filter(|p| !p.contains('='))
        .map(|p| p.to_lowercase())
        .unwrap_or_default();

    // `lang:path/to/file` shorthand on the opener's first token.
    if let Some(first) = parts.first() {
        if let Some((l, p)) = first.split_once(':') {
            if !l.is_empty() && !p.is_empty() {
                return (l.to_lowercase(), Some(p.trim_matches(['\'', '"']).to_string()), None, None);
            }
        }
    }

    let mut file_attr = None;
    let mut from_attr = None;
    let mut to_attr = None;
    for part in &parts {
        if let Some(v) = part.strip_prefix("file=") {
            file_attr = Some(v.trim_matches(['\'', '"']).to_string());
        } else if let Some(v) = part.strip_prefix("from=") {
            from_attr = Some(v.trim_matches(['\'', '"']).to_string());
        } else if let Some(v) = part.strip_prefix("to=") {
            to_attr = Some(v.trim_matches(['\'', '"']).to_string());
        }
    }
    (lang, file_attr, from_attr, to_attr)
}

const PATH_ANY: &str = r"(?:\.?/)?(?:[\w.\-]+/)+[\w.\-]+\.[A-Za-z0-9]{1,8}|[\w.\-]+\.[A-Za-z0-9]{1,8}";

fn labelled_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)\b(?:new|create(?:d)?|add(?:ed)?|write|save|file(?:name)?|filepath|path)\b\s*:?\s*[\x60'\x22]*({})",
            PATH_ANY
        ))
        .unwrap()
    })
}

fn unlabelled_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!("({})", PATH_ANY)).unwrap())
}

fn extract_path_hint_from_lines(buf: &str) -> Option<String> {
    if let Some(c) = labelled_path_re().captures(buf) {
        return Some(c[1].replace('\\', "/"));
    }
    if let Some(c) = unlabelled_path_re().captures(buf) {
        return Some(c[1].replace('\\', "/"));
    }
    None
}

fn dedent(code: &str) -> String {
    let lines: Vec<&str> = code.split('\n').collect();
    let min_indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    if min_indent == 0 {
        return code.to_string();
    }
    lines
        .iter()
        .map(|l| if l.len() >= min_indent { &l[min_indent..] } else { l.trim_start() })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_fence() {
        let md = "Some text\n```rust\nfn main() {}\n```\nmore text";
        let blocks = extract_all_blocks_from_text(md);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "rust");
        assert_eq!(blocks[0].code, "fn main() {}\n");
    }

    #[test]
    fn ignores_nested_fence() {
        let md = "````markdown\n```rust\nfn main() {}\n```\n````";
        let blocks = extract_all_blocks_from_text(md);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language, "markdown");
        assert!(blocks[0].code.contains("```rust"));
    }

    #[test]
    fn captures_file_attribute() {
        let md = "```rust file=src/main.rs\nfn main() {}\n```";
        let blocks = extract_all_blocks_from_text(md);
        assert_eq!(blocks[0].file_path_attr.as_deref(), Some("src/main.rs"));
    }

    #[test]
    fn falls_back_to_path_hint_in_context() {
        let md = "Create src/lib.rs:\n```rust\nfn main() {}\n```";
        let blocks = extract_all_blocks_from_text(md);
        assert_eq!(blocks[0].file_path_attr.as_deref(), Some("src/lib.rs"));
    }
}

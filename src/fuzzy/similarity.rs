//! Pure string/line helpers used throughout the fuzzy patch engine:
//! whitespace-loose comparison, quote normalization, comment-aware
//! whitespace flattening, indentation transplant, and line-number-prefix
//! stripping.

use regex::Regex;
use similar::TextDiff;
use std::sync::OnceLock;

/// Loose equality: both sides trimmed and compared verbatim. This is the
/// "whitespace-loose" match used when an exact line-for-line match fails
/// only because of reindentation.
pub fn eq_loose(a: &str, b: &str) -> bool {
    a.trim() == b.trim()
}

/// Replaces curly/smart quotes with their ASCII equivalents so patches
/// generated by tools that "helpfully" typographically-quote strings
/// still match source that uses plain quotes.
pub fn normalize_quotes(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201F}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect()
}

/// Ratio-style similarity between two lines: trims and quote-normalizes
/// both sides, then diffs them character-by-character.
pub fn line_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_quotes(a.trim());
    let b = normalize_quotes(b.trim());
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio() as f64
}

/// Hybrid score across a whole block: 0.6 weight on line-based structural
/// similarity, 0.4 weight on word-based content similarity — the same
/// split the teacher's windowed fuzzy matcher uses.
pub fn block_similarity(old: &[&str], candidate: &[&str]) -> f64 {
    if old.is_empty() && candidate.is_empty() {
        return 1.0;
    }
    let ratio_lines = TextDiff::from_slices(old, candidate).ratio() as f64;
    let old_content = old.join("\n");
    let candidate_content = candidate.join("\n");
    let ratio_words = TextDiff::from_words(&old_content, &candidate_content).ratio() as f64;
    0.6 * ratio_lines + 0.4 * ratio_words
}

/// Returns the leading whitespace (spaces/tabs) of a line.
pub fn leading_ws(line: &str) -> &str {
    let end = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..end]
}

/// Re-indents `lines` by replacing the indentation they share with
/// `old_indent` with `new_indent`. If a line has no `old_indent` prefix,
/// `new_indent` is prepended instead. Used to make a patch's `+` lines
/// match the file's actual indentation style at the matched anchor.
pub fn reindent_relative(lines: &[String], old_indent: &str, new_indent: &str) -> Vec<String> {
    lines
        .iter()
        .map(|line| {
            if !old_indent.is_empty() && line.starts_with(old_indent) {
                format!("{new_indent}{}", &line[old_indent.len()..])
            } else if old_indent.is_empty() {
                format!("{new_indent}{line}")
            } else {
                line.clone()
            }
        })
        .collect()
}

fn line_number_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*\d+\s*\|\s?").unwrap())
}

/// Strips an AI-added `N | ` line-number prefix, if present, from every
/// line. Returns `None` if no line carried the prefix.
pub fn strip_line_numbers<'a>(lines: &[&'a str]) -> Option<Vec<String>> {
    if !lines.iter().any(|l| line_number_prefix_re().is_match(l)) {
        return None;
    }
    Some(
        lines
            .iter()
            .map(|l| line_number_prefix_re().replace(l, "").into_owned())
            .collect(),
    )
}

/// Strips all whitespace and single-line/block comments from `lines`
/// while leaving string-literal contents (and their escape sequences)
/// untouched, so two blocks that differ only in formatting/comments can
/// be compared for structural equality.
pub fn flatten_ws(lines: &[&str]) -> String {
    let joined = lines.join("\n");
    let mut out = String::with_capacity(joined.len());
    let mut chars = joined.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = in_string {
            out.push(c);
            if c == '\\' {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
                continue;
            }
            if c == q {
                in_string = None;
            }
            continue;
        }

        match c {
            '"' | '\'' | '`' => {
                in_string = Some(c);
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&n) = chars.peek() {
                    if n == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                while let Some(n) = chars.next() {
                    if n == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        break;
                    }
                }
            }
            '#' => {
                while let Some(&n) = chars.peek() {
                    if n == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            c if c.is_whitespace() => {}
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reindent_substitutes_leading_whitespace() {
        let lines = vec!["    x".to_string()];
        assert_eq!(reindent_relative(&lines, "    ", "\t"), vec!["\tx".to_string()]);
    }

    #[test]
    fn flatten_ws_ignores_formatting() {
        let a = flatten_ws(&["  foo(  1,2 )  // note", "bar()"]);
        let b = flatten_ws(&["foo(1,2)", "bar() // different note"]);
        assert_eq!(a, b);
    }

    #[test]
    fn flatten_ws_preserves_string_contents() {
        let a = flatten_ws(&["let s = \"a b\";"]);
        assert!(a.contains("\"ab\"") == false);
        assert!(a.contains("a b"));
    }

    #[test]
    fn quote_normalization() {
        assert_eq!(normalize_quotes("\u{201C}hi\u{201D}"), "\"hi\"");
    }

    #[test]
    fn identical_lines_have_ratio_one() {
        assert_eq!(line_similarity("abc", "abc"), 1.0);
    }

    #[test]
    fn strips_line_number_prefix() {
        let lines = vec!["12 | fn main() {}", "13 | "];
        let stripped = strip_line_numbers(&lines).unwrap();
        assert_eq!(stripped[0], "fn main() {}");
    }
}

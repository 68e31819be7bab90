//! Small text utilities shared across the pipeline: end-of-line detection
//! and cleanup of raw LLM output before it is treated as file content.

/// The end-of-line convention detected in a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eol {
    Lf,
    Crlf,
    Cr,
}

impl Eol {
    pub fn as_str(self) -> &'static str {
        match self {
            Eol::Lf => "\n",
            Eol::Crlf => "\r\n",
            Eol::Cr => "\r",
        }
    }
}

/// Detects the dominant EOL style in `text`, preferring `\r\n`, then `\r`,
/// then `\n`, falling back to `\n` for EOL-free text.
pub fn detect_eol(text: &str) -> Eol {
    if text.contains("\r\n") {
        Eol::Crlf
    } else if text.contains('\r') {
        Eol::Cr
    } else {
        Eol::Lf
    }
}

/// Whether `text` ends with any EOL sequence.
pub fn ends_with_newline(text: &str) -> bool {
    text.ends_with('\n') || text.ends_with('\r')
}

/// Joins `lines` with `eol`, appending a trailing EOL iff `trailing_newline`.
pub fn join_with_eol(lines: &[String], eol: Eol, trailing_newline: bool) -> String {
    let mut out = lines.join(eol.as_str());
    if trailing_newline && !lines.is_empty() {
        out.push_str(eol.as_str());
    }
    out
}

/// Splits text into lines without its EOL markers, regardless of dialect.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Strips `<think>...</think>` reasoning blocks and a single wrapping
/// Markdown fence from raw LLM output, so it can be treated as plain file
/// content. This mirrors the cleanup step the external merge/patch
/// callbacks are expected to run on model output before handing it back.
pub fn cleanup_llm_output(raw: &str) -> String {
    let mut s = strip_think_blocks(raw);
    s = strip_wrapping_fence(&s);
    s
}

fn strip_think_blocks(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find("<think>") {
        out.push_str(&rest[..open]);
        match rest[open..].find("</think>") {
            Some(close_rel) => {
                let close = open + close_rel + "</think>".len();
                rest = &rest[close..];
            }
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

fn strip_wrapping_fence(s: &str) -> String {
    let trimmed = s.trim();
    if !trimmed.starts_with("```") {
        return s.to_string();
    }
    let Some(first_nl) = trimmed.find('\n') else {
        return s.to_string();
    };
    let after_open = &trimmed[first_nl + 1..];
    let Some(close_rel) = after_open.rfind("```") else {
        return s.to_string();
    };
    after_open[..close_rel].trim_end_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_crlf_before_lf() {
        assert_eq!(detect_eol("a\r\nb\nc"), Eol::Crlf);
    }

    #[test]
    fn detects_lf_default() {
        assert_eq!(detect_eol("a\nb"), Eol::Lf);
        assert_eq!(detect_eol("no newline here"), Eol::Lf);
    }

    #[test]
    fn strips_think_block() {
        assert_eq!(cleanup_llm_output("<think>reasoning</think>hello"), "hello");
    }

    #[test]
    fn strips_wrapping_fence() {
        assert_eq!(cleanup_llm_output("```rust\nfn main() {}\n```"), "fn main() {}");
    }

    #[test]
    fn leaves_plain_content_alone() {
        assert_eq!(cleanup_llm_output("fn main() {}\n"), "fn main() {}\n");
    }
}

//! Structured patch mode: apply a list of `{old?, new?, pattern?}`
//! operations to file content, bypassing hunk location entirely.

use regex::Regex;
use similar::TextDiff;

use crate::error::PatchFailedError;
use crate::fuzzy::CONFLICT_THRESHOLD;

/// One structured edit operation. Exactly one of `pattern` or `old` must
/// be set; `new` defaults to empty (a pure deletion) when absent.
#[derive(Debug, Clone, Default)]
pub struct StructuredOp {
    pub old: Option<String>,
    pub new: Option<String>,
    pub pattern: Option<String>,
}

/// Applies `ops` to `content` in order, each replacing its target
/// substring once.
pub fn apply_structured_ops(content: &str, ops: &[StructuredOp]) -> Result<String, PatchFailedError> {
    let mut current = content.to_string();
    for (i, op) in ops.iter().enumerate() {
        current = apply_one(&current, op, i)?;
    }
    Ok(current)
}

fn apply_one(content: &str, op: &StructuredOp, index: usize) -> Result<String, PatchFailedError> {
    if let Some(pattern) = &op.pattern {
        let re = Regex::new(pattern).map_err(|source| PatchFailedError::InvalidPattern { op_index: index, source })?;
        let replacement = op.new.clone().unwrap_or_default();
        return Ok(re.replacen(content, 1, replacement.as_str()).into_owned());
    }

    let Some(old) = &op.old else {
        return Err(PatchFailedError::MissingOperand { op_index: index });
    };
    let new = op.new.clone().unwrap_or_default();

    if let Some((head, tail)) = common_head_tail(old, &new) {
        if !head.is_empty() || !tail.is_empty() {
            let inner_old = &old[head.len()..old.len() - tail.len()];
            let inner_new = &new[head.len()..new.len() - tail.len()];
            if !inner_old.is_empty() {
                if let Some(pos) = content.find(inner_old) {
                    let mut out = String::with_capacity(content.len());
                    out.push_str(&content[..pos]);
                    out.push_str(inner_new);
                    out.push_str(&content[pos + inner_old.len()..]);
                    return Ok(out);
                }
            }
        }
    }

    match content.find(old.as_str()) {
        Some(pos) => {
            let mut out = String::with_capacity(content.len());
            out.push_str(&content[..pos]);
            out.push_str(&new);
            out.push_str(&content[pos + old.len()..]);
            Ok(out)
        }
        None => Err(PatchFailedError::Unlocatable {
            hunk_index: index,
            best_ratio: TextDiff::from_chars(content, old.as_str()).ratio() as f64,
            threshold: CONFLICT_THRESHOLD,
        }),
    }
}

/// Finds the shared prefix/suffix between `old` and `new`, so a
/// search/replace pair that shares most of its text only needs to touch
/// the differing middle span. Returns `None` if the shared span would
/// overlap itself.
fn common_head_tail(old: &str, new: &str) -> Option<(&str, &str)> {
    let old_bytes = old.as_bytes();
    let new_bytes = new.as_bytes();
    let max_head = old_bytes.len().min(new_bytes.len());
    let mut head = 0;
    while head < max_head && old_bytes[head] == new_bytes[head] {
        head += 1;
    }
    let max_tail = (old_bytes.len() - head).min(new_bytes.len() - head);
    let mut tail = 0;
    while tail < max_tail
        && old_bytes[old_bytes.len() - 1 - tail] == new_bytes[new_bytes.len() - 1 - tail]
    {
        tail += 1;
    }
    if head + tail > old_bytes.len() || head + tail > new_bytes.len() {
        tail = 0;
    }
    while !old.is_char_boundary(head) || !new.is_char_boundary(head) {
        head -= 1;
    }
    while !old.is_char_boundary(old.len() - tail) || !new.is_char_boundary(new.len() - tail) {
        tail -= 1;
    }
    Some((&old[..head], &old[old.len() - tail..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_replace() {
        let out = apply_structured_ops("a\nb\nc\n", &[StructuredOp { old: Some("b".into()), new: Some("B".into()), pattern: None }]).unwrap();
        assert_eq!(out, "a\nB\nc\n");
    }

    #[test]
    fn regex_replace() {
        let out = apply_structured_ops("foo123bar", &[StructuredOp { old: None, new: Some("X".into()), pattern: Some(r"\d+".into()) }]).unwrap();
        assert_eq!(out, "fooXbar");
    }

    #[test]
    fn missing_operand_errors() {
        let err = apply_structured_ops("abc", &[StructuredOp::default()]).unwrap_err();
        assert!(matches!(err, PatchFailedError::MissingOperand { op_index: 0 }));
    }

    #[test]
    fn shared_head_tail_edits_only_middle() {
        let old = "function foo(a, b) {";
        let new = "function foo(a, b, c) {";
        let out = apply_structured_ops(
            "x\nfunction foo(a, b) {\ny\n",
            &[StructuredOp { old: Some(old.into()), new: Some(new.into()), pattern: None }],
        )
        .unwrap();
        assert_eq!(out, "x\nfunction foo(a, b, c) {\ny\n");
    }
}

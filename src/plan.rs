//! Change Planner: turns extracted [`Block`]s into [`PlannedChange`]s by
//! resolving each block's target path against the codebase on disk and
//! reading whatever content currently exists there.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::block::Block;
use crate::classify::{extract_file_info_from_context_and_code, BlockMetadata, ChangeType};
use crate::commit::{Change, ChangeAction};
use crate::fuzzy::{patch_text, structured::StructuredOp, PatchInput};
use crate::paths::{is_bare_filename, normalize_path, resolve_bare_filename};
use crate::text::cleanup_llm_output;

/// A block paired with the metadata needed to turn it into a [`Change`].
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub block: Block,
    pub file_path: PathBuf,
    pub change_type: PlannedType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedType {
    Create,
    FullReplacement,
    Diff,
    SearchReplace,
    Rename,
    Delete,
}

/// Resolves every block's path (including bare-filename lookups under
/// `base_dir`) and decides whether it is a create, full replacement,
/// diff, search/replace, rename, or delete. Blocks whose path cannot be
/// resolved at all are dropped with a warning rather than failing the
/// whole batch.
pub fn plan_changes(
    blocks: Vec<Block>,
    base_dir: &Path,
    classifier_callback: Option<&dyn Fn(&str, &str) -> Option<BlockMetadata>>,
) -> Vec<PlannedChange> {
    let mut out = Vec::with_capacity(blocks.len());
    for block in blocks {
        match resolve_one(block, base_dir, classifier_callback) {
            Some(planned) => out.push(planned),
            None => warn!("dropping a block with no resolvable file path"),
        }
    }
    out
}

fn resolve_one(
    block: Block,
    base_dir: &Path,
    classifier_callback: Option<&dyn Fn(&str, &str) -> Option<BlockMetadata>>,
) -> Option<PlannedChange> {
    match block {
        Block::Rename { from_path, to_path, start, end } => {
            let resolved_from = resolve_path(base_dir, &from_path);
            let resolved_to = normalize_path(&to_path);
            Some(PlannedChange {
                block: Block::Rename { from_path: resolved_from.to_string_lossy().into_owned(), to_path: to_path.clone(), start, end },
                file_path: resolved_to,
                change_type: PlannedType::Rename,
            })
        }
        Block::Delete { file_path, start, end } => {
            let resolved = resolve_path(base_dir, &file_path);
            Some(PlannedChange {
                block: Block::Delete { file_path: file_path.clone(), start, end },
                file_path: resolved,
                change_type: PlannedType::Delete,
            })
        }
        Block::SearchReplace { ref file_path, .. } => {
            let resolved = resolve_path(base_dir, file_path);
            Some(PlannedChange { file_path: resolved, change_type: PlannedType::SearchReplace, block })
        }
        Block::File { file_path, language, code, start, end, context } => {
            let path = file_path.or_else(|| {
                classifier_callback
                    .and_then(|cb| cb(&context, &code))
                    .map(|m| m.file_path)
                    .or_else(|| extract_file_info_from_context_and_code(&context, &code, &language).map(|m| m.file_path))
            })?;
            let resolved = resolve_path(base_dir, &path);
            let exists = resolved.exists();
            Some(PlannedChange {
                block: Block::File { file_path: Some(path), language, code, start, end, context },
                file_path: resolved,
                change_type: if exists { PlannedType::FullReplacement } else { PlannedType::Create },
            })
        }
        Block::Diff { file_path, code, start, end, context } => {
            let path = file_path.or_else(|| {
                classifier_callback
                    .and_then(|cb| cb(&context, &code))
                    .map(|m| m.file_path)
                    .or_else(|| extract_file_info_from_context_and_code(&context, &code, "diff").map(|m| m.file_path))
            })?;
            let resolved = resolve_path(base_dir, &path);
            Some(PlannedChange {
                block: Block::Diff { file_path: Some(path), code, start, end, context },
                file_path: resolved,
                // A diff targeting a file absent on disk is still a diff —
                // the Fuzzy Patch Engine applies it against empty content
                // and `is_new` (computed from the filesystem at apply time)
                // turns it into a create.
                change_type: PlannedType::Diff,
            })
        }
    }
}

fn resolve_path(base_dir: &Path, raw: &str) -> PathBuf {
    let normalized = normalize_path(raw);
    if is_bare_filename(raw) {
        if let Some(found) = resolve_bare_filename(base_dir, raw) {
            return found;
        }
    }
    normalized
}

/// Generates the final content for one planned change, reading whatever
/// currently exists on disk at its resolved path. Implements the tiered
/// strategy: full replacement (optionally merged if truncated),
/// search/replace (structured patch), diff (fuzzy patch, optionally
/// handed to `patch_callback` if unlocatable).
pub fn apply_change_smartly(
    plan: &PlannedChange,
    base_dir: &Path,
    merge_callback: Option<&dyn Fn(&str, &str) -> String>,
    patch_callback: Option<&dyn Fn(&str, &str) -> String>,
) -> (Option<Change>, Vec<String>) {
    let mut logs = Vec::new();
    let target_path = base_dir.join(&plan.file_path);
    let original_content = fs::read_to_string(&target_path).unwrap_or_default();
    let is_new = !target_path.exists();

    let new_content = match plan.change_type {
        PlannedType::Rename => {
            return (
                Some(Change {
                    action: ChangeAction::Rename,
                    path: plan.file_path.clone(),
                    new_content: None,
                    original_content: None,
                    from_path: match &plan.block {
                        Block::Rename { from_path, .. } => Some(PathBuf::from(from_path)),
                        _ => None,
                    },
                }),
                logs,
            );
        }
        PlannedType::Delete => {
            return (
                Some(Change {
                    action: ChangeAction::Delete,
                    path: plan.file_path.clone(),
                    new_content: None,
                    original_content: Some(original_content),
                    from_path: None,
                }),
                logs,
            );
        }
        PlannedType::SearchReplace => {
            let Block::SearchReplace { old_content, new_content, .. } = &plan.block else {
                unreachable!("SearchReplace plan carries a non-SearchReplace block")
            };
            let ops = vec![StructuredOp { old: Some(old_content.clone()), new: Some(new_content.clone()), pattern: None }];
            match patch_text(&original_content, PatchInput::Structured(ops), 0.6) {
                Ok(text) => {
                    logs.push("search/replace applied".to_string());
                    Some(text)
                }
                Err(e) => {
                    logs.push(format!("search/replace failed: {e}"));
                    None
                }
            }
        }
        PlannedType::Create | PlannedType::FullReplacement => {
            let Block::File { code, .. } = &plan.block else {
                unreachable!("Create/FullReplacement plan carries a non-File block")
            };
            if contains_truncation_marker(code) {
                logs.push("truncation markers detected in full-file replacement".to_string());
                if original_content.is_empty() {
                    logs.push("no original content to merge with; using replacement as-is".to_string());
                    Some(code.clone())
                } else if let Some(merge) = merge_callback {
                    logs.push("invoking merge_callback".to_string());
                    Some(cleanup_llm_output(&merge(&original_content, code)))
                } else {
                    logs.push("no merge_callback provided; using replacement as-is".to_string());
                    Some(code.clone())
                }
            } else {
                Some(code.clone())
            }
        }
        PlannedType::Diff => {
            let Block::Diff { code, .. } = &plan.block else {
                unreachable!("Diff plan carries a non-Diff block")
            };
            match patch_text(&original_content, PatchInput::Diff(code), 0.6) {
                Ok(text) => {
                    logs.push("fuzzy patch applied".to_string());
                    Some(text)
                }
                Err(e) => {
                    logs.push(format!("fuzzy patch failed: {e}"));
                    if let Some(cb) = patch_callback {
                        logs.push("invoking patch_callback".to_string());
                        Some(cleanup_llm_output(&cb(&original_content, code)))
                    } else {
                        debug!("no patch_callback provided for unlocatable diff");
                        None
                    }
                }
            }
        }
    };

    match new_content {
        Some(content) => (
            Some(Change {
                action: if is_new { ChangeAction::Create } else { ChangeAction::Modify },
                path: plan.file_path.clone(),
                new_content: Some(content),
                original_content: Some(original_content),
                from_path: None,
            }),
            logs,
        ),
        None => (None, logs),
    }
}

fn contains_truncation_marker(code: &str) -> bool {
    code.lines().any(|l| {
        let t = l.trim_start();
        (t.starts_with("# ...") || t.starts_with("// ...") || t.starts_with("-- ..."))
            || (t.starts_with("<!--") && t.contains("..."))
            || (t.starts_with("/*") && t.contains("..."))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn plans_create_for_missing_file() {
        let dir = tempdir().unwrap();
        let blocks = vec![Block::File {
            file_path: Some("new.rs".into()),
            language: "rust".into(),
            code: "fn main() {}\n".into(),
            start: 0,
            end: 0,
            context: String::new(),
        }];
        let planned = plan_changes(blocks, dir.path(), None);
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].change_type, PlannedType::Create);
    }

    #[test]
    fn plans_full_replacement_for_existing_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("existing.rs"), "old\n").unwrap();
        let blocks = vec![Block::File {
            file_path: Some("existing.rs".into()),
            language: "rust".into(),
            code: "new\n".into(),
            start: 0,
            end: 0,
            context: String::new(),
        }];
        let planned = plan_changes(blocks, dir.path(), None);
        assert_eq!(planned[0].change_type, PlannedType::FullReplacement);
    }

    #[test]
    fn plans_diff_for_missing_file_as_diff_not_create() {
        let dir = tempdir().unwrap();
        let blocks = vec![Block::Diff {
            file_path: Some("new.rs".into()),
            code: "@@ -0,0 +1,2 @@\n+fn main() {}\n+\n".into(),
            start: 0,
            end: 0,
            context: String::new(),
        }];
        let planned = plan_changes(blocks, dir.path(), None);
        assert_eq!(planned[0].change_type, PlannedType::Diff);

        let (change, _logs) = apply_change_smartly(&planned[0], dir.path(), None, None);
        let change = change.unwrap();
        assert_eq!(change.action, ChangeAction::Create);
        assert_eq!(change.new_content.as_deref(), Some("fn main() {}\n"));
    }

    #[test]
    fn applies_diff_change_smartly() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("f.rs"), "a\nb\nc\n").unwrap();
        let blocks = vec![Block::Diff {
            file_path: Some("f.rs".into()),
            code: "@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n".into(),
            start: 0,
            end: 0,
            context: String::new(),
        }];
        let planned = plan_changes(blocks, dir.path(), None);
        let (change, _logs) = apply_change_smartly(&planned[0], dir.path(), None, None);
        let change = change.unwrap();
        assert_eq!(change.new_content.as_deref(), Some("a\nB\nc\n"));
    }
}

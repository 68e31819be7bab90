//! The Fuzzy Patch Engine: locates each hunk of a diff inside a (possibly
//! drifted) file and applies it, falling back all the way to synthesized
//! merge-conflict markers rather than silently corrupting content.
//!
//! The algorithm runs in four phases, named in the order they execute:
//!
//! 1. [`locate_candidates`] — per-hunk, independent candidate discovery.
//! 2. [`assign_non_overlapping`] — a backtracking search over candidate
//!    lists that picks one non-overlapping, order-preserving location per
//!    hunk.
//! 3. [`refine_unresolved`] — hunks left unresolved (or low-confidence)
//!    get a second, anchor-bounded look between their nearest resolved
//!    neighbors, or a synthesized conflict block.
//! 4. [`apply_bottom_up`] — splice every resolved location into the file,
//!    highest `start_idx` first, so earlier indices stay valid.

pub mod similarity;
pub mod structured;

use log::{debug, trace, warn};

use crate::diff::{is_unified_dialect, parse_auto, Hunk};
use crate::error::PatchFailedError;
use crate::text::{detect_eol, ends_with_newline, join_with_eol, split_lines};
use similarity::{block_similarity, eq_loose, flatten_ws, leading_ws, line_similarity, reindent_relative, strip_line_numbers};
use structured::{apply_structured_ops, StructuredOp};

const PERFECT_CONFIDENCE: f64 = 0.95;
const MIDDLE_OUT_PAD: usize = 40;

/// Floor below which a located candidate is not trusted as a real match —
/// only a synthesized merge-conflict block may still stand in for the hunk.
pub(crate) const CONFLICT_THRESHOLD: f64 = 0.25;

/// Either a raw diff body or a pre-parsed list of structured ops.
pub enum PatchInput<'a> {
    Diff(&'a str),
    Structured(Vec<StructuredOp>),
}

/// How a hunk ended up assigned to a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    WhitespaceLoose,
    Fuzzy,
    LineNumberStripped,
    FlattenedAnchor,
    UniqueEndAnchor,
    BraceAware,
    Insertion,
    MergeConflict,
}

/// A candidate placement for one hunk.
#[derive(Debug, Clone)]
pub struct CandidateLocation {
    pub hunk_index: usize,
    pub start_idx: usize,
    pub end_idx: usize,
    pub replacement_lines: Vec<String>,
    pub match_type: MatchType,
    pub confidence: f64,
}

/// Diagnostic detail for a hunk that could not be placed, returned by
/// [`fuzzy_patch_partial`] instead of raising.
#[derive(Debug, Clone)]
pub struct FailedHunk {
    pub hunk_index: usize,
    pub old_content: String,
    pub new_content: String,
    pub lead_ctx: String,
    pub tail_ctx: String,
    pub header_hint: usize,
    /// The highest confidence any candidate reached for this hunk across
    /// every phase, even candidates ultimately rejected as below
    /// [`CONFLICT_THRESHOLD`]. `0.0` if nothing matched at all.
    pub best_ratio: f64,
}

/// Applies `patch` to `content`, raising on the first hunk that cannot be
/// placed with confidence `>= threshold` (or bounded-conflict-wrapped).
pub fn patch_text(content: &str, patch: PatchInput, threshold: f64) -> Result<String, PatchFailedError> {
    match patch {
        PatchInput::Structured(ops) => apply_structured_ops(content, &ops),
        PatchInput::Diff(code) => {
            let hunks = parse_auto(code)?;
            let is_unified = is_unified_dialect(code);
            let (new_text, _applied, failed) = run_engine(content, &hunks, threshold, is_unified);
            if let Some(f) = failed.into_iter().next() {
                return Err(PatchFailedError::Unlocatable {
                    hunk_index: f.hunk_index,
                    best_ratio: f.best_ratio,
                    threshold: CONFLICT_THRESHOLD,
                });
            }
            Ok(new_text)
        }
    }
}

/// Best-effort variant: never raises. Returns the new content, the
/// indices of hunks that were applied, and diagnostics for every hunk
/// that was not.
pub fn fuzzy_patch_partial(content: &str, patch: &str, threshold: f64) -> (String, Vec<usize>, Vec<FailedHunk>) {
    let hunks = match parse_auto(patch) {
        Ok(h) => h,
        Err(_) => return (content.to_string(), Vec::new(), Vec::new()),
    };
    let is_unified = is_unified_dialect(patch);
    run_engine(content, &hunks, threshold, is_unified)
}

fn run_engine(content: &str, hunks: &[Hunk], threshold: f64, is_unified: bool) -> (String, Vec<usize>, Vec<FailedHunk>) {
    let eol = detect_eol(content);
    let trailing_nl = ends_with_newline(content);
    let file_lines = split_lines(content);

    // Phase 1.
    let mut cursor = 0usize;
    let mut per_hunk_candidates: Vec<Vec<CandidateLocation>> = Vec::with_capacity(hunks.len());
    let mut hints = Vec::with_capacity(hunks.len());
    for (i, hunk) in hunks.iter().enumerate() {
        let hint = start_hint(hunk, i, cursor, is_unified, file_lines.len());
        hints.push(hint);
        let candidates = locate_candidates(&file_lines, hunk, i, hint, threshold);
        if let Some(best) = candidates.first() {
            cursor = best.end_idx;
        } else {
            cursor = hint;
        }
        per_hunk_candidates.push(candidates);
    }

    let mut best_ratios: Vec<f64> = per_hunk_candidates
        .iter()
        .map(|cands| cands.iter().map(|c| c.confidence).fold(0.0_f64, f64::max))
        .collect();

    // Phase 2.
    let mut assignment = assign_non_overlapping(&per_hunk_candidates);

    // Phase 3.
    refine_unresolved(&file_lines, hunks, &hints, &mut assignment, threshold, &mut best_ratios);

    // Phase 4.
    let (new_lines, applied, failed) = apply_bottom_up(&file_lines, hunks, &hints, assignment, &best_ratios);

    let new_text = join_with_eol(&new_lines, eol, trailing_nl || new_lines.is_empty());
    (new_text, applied, failed)
}

fn start_hint(hunk: &Hunk, index: usize, cursor: usize, is_unified: bool, file_len: usize) -> usize {
    let header_hint = hunk.new_start.saturating_sub(1);
    let hint = if is_unified {
        header_hint
    } else if index == 0 {
        header_hint
    } else if hunk.is_pure_addition() {
        header_hint.max(cursor)
    } else {
        ((0.7 * cursor as f64) + (0.3 * header_hint as f64)).round() as usize
    };
    hint.min(file_len)
}

fn locate_candidates(
    file_lines: &[String],
    hunk: &Hunk,
    hunk_index: usize,
    hint: usize,
    threshold: f64,
) -> Vec<CandidateLocation> {
    if hunk.is_pure_addition() {
        let idx = locate_insertion_index(file_lines, hunk, hint);
        return vec![CandidateLocation {
            hunk_index,
            start_idx: idx,
            end_idx: idx,
            replacement_lines: hunk.new_content().into_iter().map(str::to_string).collect(),
            match_type: MatchType::Insertion,
            confidence: 0.9,
        }];
    }

    let old_content: Vec<&str> = hunk.old_content();
    if old_content.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();

    if let Some(c) = exact_match(file_lines, hunk, hunk_index, &old_content, hint) {
        out.push(c);
    }
    if let Some(c) = loose_match(file_lines, hunk, hunk_index, &old_content, hint) {
        out.push(c);
    }
    if let Some(c) = fuzzy_windowed_match(file_lines, hunk, hunk_index, &old_content, hint, threshold) {
        out.push(c);
    }
    if let Some(stripped) = strip_line_numbers(&old_content) {
        let stripped_refs: Vec<&str> = stripped.iter().map(String::as_str).collect();
        if let Some(c) = exact_match(file_lines, hunk, hunk_index, &stripped_refs, hint) {
            out.push(CandidateLocation { match_type: MatchType::LineNumberStripped, ..c });
        }
    }
    if let Some(c) = flattened_anchor_match(file_lines, hunk, hunk_index, &old_content, hint) {
        out.push(c);
    }
    if let Some(c) = unique_end_anchor_match(file_lines, hunk, hunk_index, &old_content) {
        out.push(c);
    }
    if out.is_empty() {
        if let Some(c) = brace_aware_match(file_lines, hunk, hunk_index) {
            out.push(c);
        }
    }

    out.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap()
            .then_with(|| a.start_idx.abs_diff(hint).cmp(&b.start_idx.abs_diff(hint)))
    });
    out.dedup_by_key(|c| c.start_idx);
    out
}

fn build_replacement(file_lines: &[String], hunk: &Hunk, start_idx: usize, window_len: usize) -> Vec<String> {
    surgical_reconstruct(&file_lines[start_idx..start_idx + window_len], hunk)
}

/// Builds the replacement for a matched window by taking context lines
/// from the file (preserving any drift), dropping `-` lines, and
/// re-indenting `+` lines relative to the file's indentation at the
/// anchor.
fn surgical_reconstruct(matched_file_lines: &[String], hunk: &Hunk) -> Vec<String> {
    let old_content = hunk.old_content();
    let aligned = matched_file_lines.len() == old_content.len()
        && matched_file_lines
            .first()
            .zip(old_content.first())
            .map(|(a, b)| eq_loose(a, b))
            .unwrap_or(false);

    let file_indent = matched_file_lines.first().map(|l| leading_ws(l)).unwrap_or("");
    let patch_indent = old_content.first().map(|l| leading_ws(l)).unwrap_or("");

    if !aligned {
        let new_content: Vec<String> = hunk.new_content().into_iter().map(str::to_string).collect();
        return reindent_relative(&new_content, patch_indent, file_indent);
    }

    let mut out = Vec::new();
    let mut file_cursor = 0usize;
    for line in &hunk.lines {
        match line.kind {
            crate::diff::LineKind::Context => {
                if file_cursor < matched_file_lines.len() {
                    out.push(matched_file_lines[file_cursor].clone());
                } else {
                    out.push(line.text.clone());
                }
                file_cursor += 1;
            }
            crate::diff::LineKind::Del => {
                file_cursor += 1;
            }
            crate::diff::LineKind::Add => {
                let reindented = reindent_relative(std::slice::from_ref(&line.text), patch_indent, file_indent);
                out.push(reindented.into_iter().next().unwrap());
            }
        }
    }
    out
}

fn exact_match(
    file_lines: &[String],
    hunk: &Hunk,
    hunk_index: usize,
    old_content: &[&str],
    hint: usize,
) -> Option<CandidateLocation> {
    let window_len = old_content.len();
    if window_len == 0 || window_len > file_lines.len() {
        return None;
    }
    let mut best: Option<(usize, usize)> = None;
    for start in 0..=(file_lines.len() - window_len) {
        if file_lines[start..start + window_len].iter().map(String::as_str).eq(old_content.iter().copied()) {
            let dist = start.abs_diff(hint);
            if best.map(|(_, d)| dist < d).unwrap_or(true) {
                best = Some((start, dist));
            }
        }
    }
    best.map(|(start, _)| CandidateLocation {
        hunk_index,
        start_idx: start,
        end_idx: start + window_len,
        replacement_lines: build_replacement(file_lines, hunk, start, window_len),
        match_type: MatchType::Exact,
        confidence: 1.0,
    })
}

fn loose_match(
    file_lines: &[String],
    hunk: &Hunk,
    hunk_index: usize,
    old_content: &[&str],
    hint: usize,
) -> Option<CandidateLocation> {
    let window_len = old_content.len();
    if window_len == 0 || window_len > file_lines.len() {
        return None;
    }
    let mut best: Option<(usize, usize)> = None;
    for start in 0..=(file_lines.len() - window_len) {
        if file_lines[start..start + window_len]
            .iter()
            .zip(old_content.iter())
            .all(|(a, b)| eq_loose(a, b))
        {
            let dist = start.abs_diff(hint);
            if best.map(|(_, d)| dist < d).unwrap_or(true) {
                best = Some((start, dist));
            }
        }
    }
    best.map(|(start, dist)| CandidateLocation {
        hunk_index,
        start_idx: start,
        end_idx: start + window_len,
        replacement_lines: build_replacement(file_lines, hunk, start, window_len),
        match_type: MatchType::WhitespaceLoose,
        confidence: if dist == 0 { 0.9 } else { 0.6 },
    })
}

fn fuzzy_windowed_match(
    file_lines: &[String],
    hunk: &Hunk,
    hunk_index: usize,
    old_content: &[&str],
    hint: usize,
    threshold: f64,
) -> Option<CandidateLocation> {
    let window_len = old_content.len().min(file_lines.len());
    if window_len == 0 {
        return None;
    }
    let lo = hint.saturating_sub(MIDDLE_OUT_PAD);
    let hi = (hint + old_content.len() + MIDDLE_OUT_PAD).min(file_lines.len().saturating_sub(window_len) + 1);
    let search_range: Vec<usize> = if lo < hi {
        (lo..hi).collect()
    } else {
        (0..=(file_lines.len() - window_len)).collect()
    };

    let mut best: Option<(usize, f64)> = None;
    for start in search_range {
        if start + window_len > file_lines.len() {
            continue;
        }
        let window: Vec<&str> = file_lines[start..start + window_len].iter().map(String::as_str).collect();
        if let (Some(&first_w), Some(&first_o)) = (window.first(), old_content.first()) {
            if line_similarity(first_w, first_o) < 0.8 {
                continue;
            }
        }
        let score = block_similarity(old_content, &window);
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((start, score));
        }
    }

    best.filter(|(_, score)| *score >= threshold).map(|(start, score)| CandidateLocation {
        hunk_index,
        start_idx: start,
        end_idx: start + window_len,
        replacement_lines: build_replacement(file_lines, hunk, start, window_len),
        match_type: MatchType::Fuzzy,
        confidence: score,
    })
}

fn flattened_anchor_match(
    file_lines: &[String],
    hunk: &Hunk,
    hunk_index: usize,
    old_content: &[&str],
    hint: usize,
) -> Option<CandidateLocation> {
    let anchor = *old_content.first()?;
    let target_flat = flatten_ws(old_content);
    let max_extra = old_content.len() + 10;

    let mut candidates: Vec<usize> = file_lines
        .iter()
        .enumerate()
        .filter(|(_, l)| eq_loose(l, anchor))
        .map(|(i, _)| i)
        .collect();
    candidates.sort_by_key(|&i| i.abs_diff(hint));

    for start in candidates {
        for len in old_content.len()..=(old_content.len() + max_extra).min(file_lines.len() - start) {
            if start + len > file_lines.len() {
                break;
            }
            let window: Vec<&str> = file_lines[start..start + len].iter().map(String::as_str).collect();
            if flatten_ws(&window) == target_flat {
                return Some(CandidateLocation {
                    hunk_index,
                    start_idx: start,
                    end_idx: start + len,
                    replacement_lines: build_replacement(file_lines, hunk, start, len),
                    match_type: MatchType::FlattenedAnchor,
                    confidence: 0.75,
                });
            }
        }
    }
    None
}

fn unique_end_anchor_match(
    file_lines: &[String],
    hunk: &Hunk,
    hunk_index: usize,
    old_content: &[&str],
) -> Option<CandidateLocation> {
    let first = old_content.iter().find(|l| !l.trim().is_empty())?;
    let last = old_content.iter().rev().find(|l| !l.trim().is_empty())?;

    let first_positions: Vec<usize> = file_lines.iter().enumerate().filter(|(_, l)| eq_loose(l, first)).map(|(i, _)| i).collect();
    let last_positions: Vec<usize> = file_lines.iter().enumerate().filter(|(_, l)| eq_loose(l, last)).map(|(i, _)| i).collect();

    if last_positions.len() != 1 {
        return None;
    }
    let end = last_positions[0];
    let start = first_positions.into_iter().filter(|&s| s <= end).max()?;
    if start > end {
        return None;
    }
    let len = end - start + 1;
    Some(CandidateLocation {
        hunk_index,
        start_idx: start,
        end_idx: start + len,
        replacement_lines: build_replacement(file_lines, hunk, start, len),
        match_type: MatchType::UniqueEndAnchor,
        confidence: 0.7,
    })
}

/// Ad hoc, intentionally-unprincipled fallback: if the hunk's leading
/// context line looks like a JS/TS function declaration, find it in the
/// file and consume lines until braces balance. Only reached when every
/// other strategy above has failed.
fn brace_aware_match(file_lines: &[String], hunk: &Hunk, hunk_index: usize) -> Option<CandidateLocation> {
    let lead = hunk.lead_ctx();
    let anchor = lead.first().filter(|l| l.trim_start().starts_with("function "))?;
    let start = file_lines.iter().position(|l| eq_loose(l, anchor))?;

    let mut depth = 0i64;
    let mut seen_open = false;
    let mut end = start;
    for (i, line) in file_lines.iter().enumerate().skip(start) {
        for c in line.chars() {
            if c == '{' {
                depth += 1;
                seen_open = true;
            } else if c == '}' {
                depth -= 1;
            }
        }
        end = i;
        if seen_open && depth <= 0 {
            break;
        }
    }
    let len = end - start + 1;
    Some(CandidateLocation {
        hunk_index,
        start_idx: start,
        end_idx: start + len,
        replacement_lines: build_replacement(file_lines, hunk, start, len),
        match_type: MatchType::BraceAware,
        confidence: 0.55,
    })
}

/// Sandwiches `start_hint` between the best loose match of `lead_ctx`'s
/// tail and `tail_ctx`'s head, for a pure-addition hunk with no `old`
/// content to locate against.
fn locate_insertion_index(file_lines: &[String], hunk: &Hunk, start_hint: usize) -> usize {
    let lead_ctx = hunk.lead_ctx();
    let tail_ctx = hunk.tail_ctx();

    let lead_anchor = lead_ctx.last();
    let tail_anchor = tail_ctx.first();

    let lead_end = lead_anchor.and_then(|l| {
        file_lines
            .iter()
            .enumerate()
            .filter(|(_, fl)| eq_loose(fl, l))
            .map(|(i, _)| i + 1)
            .min_by_key(|&i| i.abs_diff(start_hint))
    });
    let tail_start = tail_anchor.and_then(|l| {
        file_lines
            .iter()
            .enumerate()
            .filter(|(_, fl)| eq_loose(fl, l))
            .map(|(i, _)| i)
            .min_by_key(|&i| i.abs_diff(start_hint))
    });

    match (lead_end, tail_start) {
        (Some(l), Some(t)) if l <= t => start_hint.clamp(l, t),
        (Some(l), Some(t)) => {
            if start_hint.abs_diff(l) <= start_hint.abs_diff(t) {
                l
            } else {
                t
            }
        }
        (Some(l), None) => l.max(start_hint.min(file_lines.len())),
        (None, Some(t)) => t.min(start_hint),
        (None, None) => start_hint.min(file_lines.len()),
    }
    .min(file_lines.len())
}

/// Picks one non-overlapping, start-increasing candidate per hunk using
/// a backtracking search over each hunk's candidates in
/// confidence-descending order. The first feasible assignment wins.
fn assign_non_overlapping(per_hunk: &[Vec<CandidateLocation>]) -> Vec<Option<CandidateLocation>> {
    let n = per_hunk.len();
    let mut chosen: Vec<Option<CandidateLocation>> = vec![None; n];

    fn backtrack(
        i: usize,
        per_hunk: &[Vec<CandidateLocation>],
        chosen: &mut Vec<Option<CandidateLocation>>,
        last_start: i64,
        last_end: usize,
    ) -> bool {
        if i == per_hunk.len() {
            return true;
        }
        // Insertions (start_idx == end_idx) may sit at the same point as
        // the previous hunk's end; real deletions/replacements must
        // start strictly after it.
        for candidate in &per_hunk[i] {
            let strictly_ok = if candidate.start_idx == candidate.end_idx {
                candidate.start_idx as i64 >= last_start && candidate.start_idx >= last_end
            } else {
                (candidate.start_idx as i64) > last_start && candidate.start_idx >= last_end
            };
            if strictly_ok {
                chosen[i] = Some(candidate.clone());
                if backtrack(i + 1, per_hunk, chosen, candidate.start_idx as i64, candidate.end_idx) {
                    return true;
                }
                chosen[i] = None;
            }
        }
        // No candidate fit; leave this hunk unresolved and keep going so
        // later hunks can still be placed (Phase 3 revisits this one).
        backtrack(i + 1, per_hunk, chosen, last_start, last_end)
    }

    backtrack(0, per_hunk, &mut chosen, -1, 0);
    chosen
}

fn refine_unresolved(
    file_lines: &[String],
    hunks: &[Hunk],
    hints: &[usize],
    assignment: &mut [Option<CandidateLocation>],
    threshold: f64,
    best_ratios: &mut [f64],
) {
    let n = hunks.len();
    for i in 0..n {
        let is_perfect = assignment[i].as_ref().map(|c| c.confidence >= PERFECT_CONFIDENCE).unwrap_or(false);
        if is_perfect {
            continue;
        }

        let pred_end = (0..i)
            .rev()
            .find_map(|j| assignment[j].as_ref().filter(|c| c.confidence >= PERFECT_CONFIDENCE).map(|c| c.end_idx));
        let succ_start = (i + 1..n)
            .find_map(|j| assignment[j].as_ref().filter(|c| c.confidence >= PERFECT_CONFIDENCE).map(|c| c.start_idx));

        let lo = pred_end.unwrap_or(0);
        let hi = succ_start.unwrap_or(file_lines.len());
        if lo > hi {
            continue;
        }

        if lo < hi {
            let bounded_lines = &file_lines[lo..hi];
            let rebased: Vec<CandidateLocation> = locate_candidates(bounded_lines, &hunks[i], i, hints[i].saturating_sub(lo).min(hi - lo), threshold)
                .into_iter()
                .map(|mut c| {
                    c.start_idx += lo;
                    c.end_idx += lo;
                    c
                })
                .collect();
            if let Some(best) = rebased.into_iter().next() {
                best_ratios[i] = best_ratios[i].max(best.confidence);
                // Below the conflict floor, a candidate isn't trustworthy
                // enough to accept as a real match — fall through to
                // conflict synthesis (or leave unresolved) instead.
                if best.confidence >= CONFLICT_THRESHOLD {
                    assignment[i] = Some(best);
                    continue;
                }
            }
        }

        if pred_end.is_some() && succ_start.is_some() {
            assignment[i] = Some(synthesize_conflict(file_lines, &hunks[i], i, lo, hi));
        }
    }
}

fn synthesize_conflict(file_lines: &[String], hunk: &Hunk, hunk_index: usize, lo: usize, hi: usize) -> CandidateLocation {
    let span = (hi - lo).min(hunk.old_content().len().max(1));
    let start = lo;
    let end = (lo + span).min(hi);
    let original_slice = file_lines[start..end].join("\n");
    let new_content = hunk.new_content().join("\n");

    let mut block = Vec::new();
    block.push("<<<<<<< CURRENT (file content)".to_string());
    block.extend(original_slice.lines().map(str::to_string));
    block.push("=======".to_string());
    block.extend(new_content.lines().map(str::to_string));
    block.push(format!(">>>>>>> PATCH (hunk #{hunk_index})"));

    warn!("hunk #{hunk_index} could not be located; synthesizing a merge-conflict block");

    CandidateLocation {
        hunk_index,
        start_idx: start,
        end_idx: end,
        replacement_lines: block,
        match_type: MatchType::MergeConflict,
        confidence: 0.0,
    }
}

fn apply_bottom_up(
    file_lines: &[String],
    hunks: &[Hunk],
    hints: &[usize],
    assignment: Vec<Option<CandidateLocation>>,
    best_ratios: &[f64],
) -> (Vec<String>, Vec<usize>, Vec<FailedHunk>) {
    let mut order: Vec<usize> = (0..assignment.len()).collect();
    order.sort_by(|&a, &b| {
        let sa = assignment[a].as_ref().map(|c| c.start_idx);
        let sb = assignment[b].as_ref().map(|c| c.start_idx);
        sb.cmp(&sa).then(a.cmp(&b))
    });

    let mut lines = file_lines.to_vec();
    let mut applied = Vec::new();
    let mut failed = Vec::new();

    for i in order {
        match &assignment[i] {
            Some(c) => {
                if c.start_idx > lines.len() || c.end_idx > lines.len() || c.start_idx > c.end_idx {
                    trace!("hunk #{i} candidate out of bounds after prior splices; skipping");
                    failed.push(failed_hunk(&hunks[i], i, hints[i], best_ratios[i]));
                    continue;
                }
                lines.splice(c.start_idx..c.end_idx, c.replacement_lines.clone());
                applied.push(i);
            }
            None => {
                debug!("hunk #{i} left unresolved; no bounded neighbors to synthesize a conflict against");
                failed.push(failed_hunk(&hunks[i], i, hints[i], best_ratios[i]));
            }
        }
    }

    applied.sort_unstable();
    (lines, applied, failed)
}

fn failed_hunk(hunk: &Hunk, index: usize, hint: usize, best_ratio: f64) -> FailedHunk {
    FailedHunk {
        hunk_index: index,
        old_content: hunk.old_content().join("\n"),
        new_content: hunk.new_content().join("\n"),
        lead_ctx: hunk.lead_ctx().join("\n"),
        tail_ctx: hunk.tail_ctx().join("\n"),
        header_hint: hint,
        best_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_exact_match_then_addition() {
        let content = "a\nb\nc\n";
        let patch = "@@ -1,3 +1,4 @@\n a\n-b\n+B\n c\n+d\n";
        let out = patch_text(content, PatchInput::Diff(patch), 0.6).unwrap();
        assert_eq!(out, "a\nB\nc\nd\n");
    }

    #[test]
    fn exact_match_twice_fails_second_time() {
        let content = "a\nb\nc\n";
        let patch = "@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n";
        let once = patch_text(content, PatchInput::Diff(patch), 0.6).unwrap();
        assert_eq!(once, "a\nB\nc\n");
        let twice = patch_text(&once, PatchInput::Diff(patch), 0.6);
        assert!(twice.is_err());
    }

    #[test]
    fn preserves_crlf_and_trailing_newline() {
        let content = "a\r\nb\r\nc\r\n";
        let patch = "@@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n";
        let out = patch_text(content, PatchInput::Diff(patch), 0.6).unwrap();
        assert_eq!(out, "a\r\nB\r\nc\r\n");
    }

    #[test]
    fn unbounded_hunks_sandwiching_a_drifted_middle_synthesize_conflict_markers() {
        let content = "START\nunexpected drifted line\nEND\n";
        let patch = "@@ -1,1 +1,1 @@\n START\n@@ -2,1 +2,1 @@\n-middle\n+REPLACED\n@@ -3,1 +3,1 @@\n END\n";
        let (out, applied, _failed) = fuzzy_patch_partial(content, patch, 0.6);
        assert!(applied.contains(&0));
        assert!(applied.contains(&2));
        assert!(out.contains("<<<<<<< CURRENT (file content)"));
        assert!(out.contains("======="));
        assert!(out.contains("REPLACED"));
        assert!(out.contains(">>>>>>> PATCH (hunk #1)"));
    }

    #[test]
    fn best_effort_never_raises_on_unlocatable_hunk() {
        let content = "totally unrelated content\n";
        let patch = "@@ -1,3 +1,3 @@\n nothing\n-matches\n+here\n at all\n";
        let (_out, applied, failed) = fuzzy_patch_partial(content, patch, 0.6);
        assert!(applied.is_empty());
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].hunk_index, 0);
    }

    #[test]
    fn strict_mode_unlocatable_reports_real_ratio_against_conflict_floor() {
        let content = "totally unrelated content\n";
        let patch = "@@ -1,3 +1,3 @@\n nothing\n-matches\n+here\n at all\n";
        let err = patch_text(content, PatchInput::Diff(patch), 0.6).unwrap_err();
        match err {
            PatchFailedError::Unlocatable { hunk_index, best_ratio, threshold } => {
                assert_eq!(hunk_index, 0);
                assert_eq!(threshold, CONFLICT_THRESHOLD);
                assert!((0.0..1.0).contains(&best_ratio));
            }
            other => panic!("expected Unlocatable, got {other:?}"),
        }
    }
}

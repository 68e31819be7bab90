//! Typed error taxonomy for every fallible stage of the pipeline.
//!
//! Extraction and classification are tolerant (see [`crate::block`] and
//! [`crate::classify`]) and never produce an `Err` at all — unknown or
//! malformed fenced blocks are skipped and logged at `debug` instead; the
//! patch engine and commit engine are where these variants actually surface.

use std::path::PathBuf;
use thiserror::Error;

/// Failures while parsing hunk headers out of a diff body.
#[derive(Error, Debug)]
pub enum ParseError {
    /// No `@@ ... @@` or simplified `@@` separators were found at all.
    #[error("no hunks could be parsed from the supplied patch")]
    NoHunks,
}

/// Failures from the fuzzy patch engine in strict mode.
#[derive(Error, Debug)]
pub enum PatchFailedError {
    /// A hunk could not be located with acceptable confidence anywhere in
    /// the file, even accounting for the anchor-bounded conflict fallback.
    #[error("hunk #{hunk_index} could not be located (best match ratio {best_ratio:.2} < {threshold:.2})")]
    Unlocatable {
        hunk_index: usize,
        best_ratio: f64,
        threshold: f64,
    },
    /// `parse_diffs`/`parse_simplified` produced zero hunks.
    #[error(transparent)]
    NoHunks(#[from] ParseError),
    /// A structured op supplied neither `old` nor `pattern`.
    #[error("structured patch op #{op_index} has neither `old` nor `pattern`")]
    MissingOperand { op_index: usize },
    /// A structured op's `pattern` failed to compile as a regex.
    #[error("structured patch op #{op_index} has an invalid regex: {source}")]
    InvalidPattern {
        op_index: usize,
        #[source]
        source: regex::Error,
    },
}

/// A resolved path escaped the sandbox rooted at the commit engine's base
/// directory.
#[derive(Error, Debug)]
#[error("path '{0}' resolves outside the target directory")]
pub struct PathViolation(pub PathBuf);

/// I/O-level failure surfaced while committing a change to disk.
#[derive(Error, Debug)]
pub enum CommitError {
    #[error("I/O error while processing {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    PathViolation(#[from] PathViolation),
    /// A change's precondition didn't hold (e.g. a rename's source doesn't
    /// exist, a create's target already does).
    #[error("{0}")]
    Validation(String),
}

//! Commit Engine: executes a batch of [`Change`]s against a sandboxed
//! base directory, with optional atomic staging, backups, and rollback.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::Builder as TempFileBuilder;

use crate::error::CommitError;
use crate::paths::sandboxed_join;

/// What a [`Change`] does to the file at `path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Create,
    Modify,
    Delete,
    Rename,
}

/// One filesystem mutation to perform.
#[derive(Debug, Clone)]
pub struct Change {
    pub action: ChangeAction,
    pub path: PathBuf,
    pub new_content: Option<String>,
    pub original_content: Option<String>,
    pub from_path: Option<PathBuf>,
}

/// Whether the engine stops at the first failure or keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    BestEffort,
    FailFast,
}

/// Tunables for [`commit_changes`].
#[derive(Debug, Clone)]
pub struct CommitOptions {
    pub mode: CommitMode,
    pub atomic: bool,
    pub dry_run: bool,
    pub backup_ext: Option<String>,
}

impl Default for CommitOptions {
    fn default() -> Self {
        CommitOptions { mode: CommitMode::BestEffort, atomic: false, dry_run: false, backup_ext: None }
    }
}

impl CommitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run() -> Self {
        CommitOptions { dry_run: true, ..Self::default() }
    }

    pub fn atomic_fail_fast() -> Self {
        CommitOptions { mode: CommitMode::FailFast, atomic: true, ..Self::default() }
    }

    pub fn with_backup(mut self, ext: impl Into<String>) -> Self {
        let mut ext = ext.into();
        if !ext.starts_with('.') {
            ext = format!(".{ext}");
        }
        self.backup_ext = Some(ext);
        self
    }
}

/// Outcome of a commit: which paths succeeded, which failed, and why.
#[derive(Debug, Clone, Default)]
pub struct CommitSummary {
    pub success: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
    pub errors: HashMap<PathBuf, String>,
    pub dry_run: bool,
}

/// A promoted change, recorded so it can be reversed if a later change in
/// the same batch fails under atomic+fail-fast.
enum Promoted {
    Created(PathBuf),
    Modified { path: PathBuf, original: String },
    Deleted { path: PathBuf, original: String },
    Renamed { from: PathBuf, to: PathBuf },
}

/// Applies `changes` to `base_dir` according to `options`. Every path is
/// sandboxed: a change whose resolved path escapes `base_dir` is recorded
/// as a failure (`PathViolation`) rather than touching the filesystem.
pub fn commit_changes(base_dir: &Path, changes: Vec<Change>, options: CommitOptions) -> CommitSummary {
    let mut summary = CommitSummary { dry_run: options.dry_run, ..Default::default() };

    if options.dry_run {
        for change in &changes {
            match validate_dry_run(base_dir, change) {
                Ok(()) => summary.success.push(change.path.clone()),
                Err(msg) => {
                    summary.failed.push(change.path.clone());
                    summary.errors.insert(change.path.clone(), msg);
                }
            }
        }
        return summary;
    }

    let mut promoted: Vec<Promoted> = Vec::new();

    for change in changes {
        match apply_one(base_dir, &change, &options) {
            Ok(record) => {
                summary.success.push(change.path.clone());
                promoted.push(record);
            }
            Err(msg) => {
                summary.failed.push(change.path.clone());
                summary.errors.insert(change.path.clone(), msg);
                if options.mode == CommitMode::FailFast {
                    if options.atomic {
                        rollback(base_dir, promoted);
                    }
                    return summary;
                }
            }
        }
    }

    summary
}

fn validate_dry_run(base_dir: &Path, change: &Change) -> Result<(), String> {
    validate_dry_run_inner(base_dir, change).map_err(|e| e.to_string())
}

fn validate_dry_run_inner(base_dir: &Path, change: &Change) -> Result<(), CommitError> {
    let resolved = sandboxed_join(base_dir, &change.path)?;
    match change.action {
        ChangeAction::Create => {
            if resolved.exists() {
                return Err(CommitError::Validation(format!("{} already exists", resolved.display())));
            }
        }
        ChangeAction::Modify | ChangeAction::Delete => {
            if !resolved.exists() {
                return Err(CommitError::Validation(format!("{} does not exist", resolved.display())));
            }
        }
        ChangeAction::Rename => {
            let from = change
                .from_path
                .as_ref()
                .ok_or_else(|| CommitError::Validation("rename is missing from_path".to_string()))?;
            let resolved_from = sandboxed_join(base_dir, from)?;
            if !resolved_from.exists() {
                return Err(CommitError::Validation(format!("{} does not exist", resolved_from.display())));
            }
        }
    }
    Ok(())
}

fn apply_one(base_dir: &Path, change: &Change, options: &CommitOptions) -> Result<Promoted, String> {
    apply_one_inner(base_dir, change, options).map_err(|e| e.to_string())
}

fn apply_one_inner(base_dir: &Path, change: &Change, options: &CommitOptions) -> Result<Promoted, CommitError> {
    let resolved = sandboxed_join(base_dir, &change.path)?;

    match change.action {
        ChangeAction::Create => {
            let content = change.new_content.as_deref().unwrap_or_default();
            write_content(&resolved, content, options.atomic)?;
            info!("created {}", resolved.display());
            Ok(Promoted::Created(resolved))
        }
        ChangeAction::Modify => {
            let original = fs::read_to_string(&resolved).unwrap_or_default();
            if let Some(ext) = &options.backup_ext {
                let backup_path = with_appended_extension(&resolved, ext);
                fs::copy(&resolved, &backup_path)
                    .map_err(|source| CommitError::Io { path: backup_path.clone(), source })?;
            }
            let content = change.new_content.as_deref().unwrap_or_default();
            write_content(&resolved, content, options.atomic)?;
            info!("modified {}", resolved.display());
            Ok(Promoted::Modified { path: resolved, original })
        }
        ChangeAction::Delete => {
            let original = fs::read_to_string(&resolved).unwrap_or_default();
            fs::remove_file(&resolved).map_err(|source| CommitError::Io { path: resolved.clone(), source })?;
            info!("deleted {}", resolved.display());
            Ok(Promoted::Deleted { path: resolved, original })
        }
        ChangeAction::Rename => {
            let from = change
                .from_path
                .as_ref()
                .ok_or_else(|| CommitError::Validation("rename is missing from_path".to_string()))?;
            let resolved_from = sandboxed_join(base_dir, from)?;
            fs::rename(&resolved_from, &resolved).map_err(|source| CommitError::Io { path: resolved_from.clone(), source })?;
            info!("renamed {} -> {}", resolved_from.display(), resolved.display());
            Ok(Promoted::Renamed { from: resolved_from, to: resolved })
        }
    }
}

fn write_content(dest: &Path, content: &str, atomic: bool) -> Result<(), CommitError> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|source| CommitError::Io { path: parent.to_path_buf(), source })?;
    }
    if !atomic {
        return fs::write(dest, content).map_err(|source| CommitError::Io { path: dest.to_path_buf(), source });
    }
    let parent = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = TempFileBuilder::new()
        .prefix(".patchforge-")
        .tempfile_in(parent)
        .map_err(|source| CommitError::Io { path: parent.to_path_buf(), source })?;
    use std::io::Write;
    tmp.write_all(content.as_bytes())
        .map_err(|source| CommitError::Io { path: dest.to_path_buf(), source })?;
    tmp.flush().map_err(|source| CommitError::Io { path: dest.to_path_buf(), source })?;
    tmp.persist(dest).map_err(|e| CommitError::Io { path: dest.to_path_buf(), source: e.error })?;
    Ok(())
}

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(ext);
    PathBuf::from(s)
}

/// Reverses every promoted operation, in last-applied-first order:
/// creates are deleted, modifies get their original content back,
/// deletes are recreated, renames are renamed back.
fn rollback(_base_dir: &Path, promoted: Vec<Promoted>) {
    for record in promoted.into_iter().rev() {
        let result = match record {
            Promoted::Created(path) => fs::remove_file(&path),
            Promoted::Modified { path, original } => fs::write(&path, original),
            Promoted::Deleted { path, original } => fs::write(&path, original),
            Promoted::Renamed { from, to } => fs::rename(&to, &from),
        };
        if let Err(e) = result {
            warn!("rollback step failed: {e}");
        }
    }
}

//! Path normalization, bare-filename resolution, and the sandbox check
//! shared by the planner and commit engine.

use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;

/// Normalizes a path string from a Markdown block: accepts `/` or `\` as
/// separators, always emits `/`-joined components, and drops a leading
/// `./`.
pub fn normalize_path(raw: &str) -> PathBuf {
    let replaced = raw.replace('\\', "/");
    let mut out = PathBuf::new();
    for component in Path::new(&replaced).components() {
        match component {
            Component::CurDir => {}
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::Prefix(_) | Component::ParentDir => out.push(component.as_os_str()),
        }
    }
    out
}

/// Returns true if `candidate` is a bare filename: no path separators of
/// either flavor.
pub fn is_bare_filename(candidate: &str) -> bool {
    !candidate.contains('/') && !candidate.contains('\\')
}

/// Walks `base_dir` (skipping `.git` and anything the nearest `.gitignore`
/// excludes) looking for files named `filename`. Returns the unique match,
/// relative to `base_dir`, or `None` if there were zero or more than one.
pub fn resolve_bare_filename(base_dir: &Path, filename: &str) -> Option<PathBuf> {
    let mut matches = Vec::new();
    let walker = WalkBuilder::new(base_dir)
        .hidden(false)
        .git_ignore(true)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();
    for entry in walker.flatten() {
        if entry.file_type().is_some_and(|t| t.is_file()) && entry.file_name() == filename {
            if let Ok(rel) = entry.path().strip_prefix(base_dir) {
                matches.push(rel.to_path_buf());
            }
        }
    }
    if matches.len() == 1 {
        matches.pop()
    } else {
        None
    }
}

/// Resolves `relative` against `base_dir` and verifies the result is
/// contained within `base_dir`, without requiring either path to exist
/// (suitable for `Create` targets whose file does not exist yet).
///
/// This is the sandbox check the commit engine uses for every filesystem
/// mutation: a patch that names `../../etc/passwd` must never escape the
/// directory it was asked to operate in.
pub fn sandboxed_join(base_dir: &Path, relative: &Path) -> Result<PathBuf, crate::error::PathViolation> {
    let candidate = base_dir.join(relative);
    let normalized = lexically_normalize(&candidate);
    let base_normalized = lexically_normalize(base_dir);
    if normalized.starts_with(&base_normalized) {
        Ok(normalized)
    } else {
        Err(crate::error::PathViolation(relative.to_path_buf()))
    }
}

/// Lexical (non-syscall) path normalization: resolves `.`/`..` components
/// without touching the filesystem, so the sandbox check works even when
/// the target does not exist yet.
fn lexically_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslashes() {
        assert_eq!(normalize_path("src\\main.rs"), PathBuf::from("src/main.rs"));
    }

    #[test]
    fn detects_bare_filename() {
        assert!(is_bare_filename("main.rs"));
        assert!(!is_bare_filename("src/main.rs"));
    }

    #[test]
    fn rejects_traversal() {
        let base = Path::new("/tmp/codebase");
        let err = sandboxed_join(base, Path::new("../evil.txt")).unwrap_err();
        assert_eq!(err.0, Path::new("../evil.txt"));
    }

    #[test]
    fn allows_nested_path() {
        let base = Path::new("/tmp/codebase");
        let ok = sandboxed_join(base, Path::new("src/main.rs")).unwrap();
        assert_eq!(ok, Path::new("/tmp/codebase/src/main.rs"));
    }
}

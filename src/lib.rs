//! Turns freeform, model-generated Markdown describing code edits into a
//! validated, atomically committed set of filesystem changes.
//!
//! `patchforge` is the Edit Core of a larger assistant pipeline: it does
//! not talk to a model itself. Given Markdown text, it:
//!
//! 1. **Extracts** structured edit blocks ([`block::extract_blocks`]) —
//!    full files, diffs, renames, deletes, and SEARCH/REPLACE pairs —
//!    from arbitrary fenced (or unfenced) Markdown.
//! 2. **Locates** each diff's hunks inside the target file even when the
//!    file has drifted from what the patch assumes, using the fuzzy
//!    patch engine ([`fuzzy::patch_text`]).
//! 3. **Plans** ([`plan::plan_changes`]) and **commits**
//!    ([`commit::commit_changes`]) the resulting changes, with an
//!    optional atomic, rollback-capable mode.
//!
//! ## Example
//!
//! ```
//! use patchforge::block::extract_blocks;
//! use patchforge::plan::{plan_changes, apply_change_smartly};
//! use patchforge::commit::{commit_changes, CommitOptions, ChangeAction};
//! use tempfile::tempdir;
//! use std::fs;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempdir()?;
//! fs::write(dir.path().join("main.rs"), "fn main() {\n    println!(\"hi\");\n}\n")?;
//!
//! let markdown = r#"
//! ```diff file=main.rs
//! --- a/main.rs
//! +++ b/main.rs
//! @@ -1,3 +1,3 @@
//!  fn main() {
//! -    println!("hi");
//! +    println!("bye");
//!  }
//! ```
//! "#;
//!
//! let blocks = extract_blocks(markdown);
//! let planned = plan_changes(blocks, dir.path(), None);
//! let mut changes = Vec::new();
//! for plan in &planned {
//!     if let (Some(change), _logs) = apply_change_smartly(plan, dir.path(), None, None) {
//!         changes.push(change);
//!     }
//! }
//! let summary = commit_changes(dir.path(), changes, CommitOptions::new());
//! assert!(summary.failed.is_empty());
//! assert_eq!(fs::read_to_string(dir.path().join("main.rs"))?, "fn main() {\n    println!(\"bye\");\n}\n");
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod classify;
pub mod commit;
pub mod diff;
pub mod error;
pub mod fuzzy;
pub mod paths;
pub mod plan;
pub mod text;

pub use block::{extract_blocks, Block};
pub use commit::{commit_changes, Change, ChangeAction, CommitMode, CommitOptions, CommitSummary};
pub use diff::{parse_auto, Hunk};
pub use error::{CommitError, ParseError, PatchFailedError, PathViolation};
pub use fuzzy::{fuzzy_patch_partial, patch_text, CandidateLocation, FailedHunk, MatchType, PatchInput};
pub use plan::{apply_change_smartly, plan_changes, PlannedChange, PlannedType};

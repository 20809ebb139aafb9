//! The [`GitRepo`] trait: the single abstraction boundary between subsync and git.
//!
//! The trait is object-safe so callers can use `&dyn GitRepo`. Method groups
//! follow the git operations the sync workflow needs:
//!
//! | Group      | Methods                                                     |
//! |------------|-------------------------------------------------------------|
//! | Repository | `root`, `git_dir`, `is_dirty`, `reset_hard`                 |
//! | Refs       | `rev_parse`, `current_branch`, `checkout*`, `delete_branch` |
//! | History    | `log_path`, `log_root_trees`, `ls_tree_path`, `subjects`    |
//! | Remotes    | `ls_remote`, `fetch`                                        |
//! | Patches    | `format_patch`, `diff_patch`, `committer_ident`             |
//! | Apply      | `apply_mailbox`, `apply_in_progress`, `abort_apply`, `merge_no_ff` |

use std::path::Path;

use crate::error::GitError;
use crate::types::{ApplyOutcome, CommitFilter, GitOid, PatchSpec, RemoteRef, TreeEntry};

/// The git abstraction used by the subsync library.
///
/// Paths passed to history methods are repository-relative with `/`
/// separators and no leading or trailing slash; the empty string means the
/// repository root.
pub trait GitRepo {
    // -----------------------------------------------------------------------
    // Repository
    // -----------------------------------------------------------------------

    /// Top-level directory of the working tree. Every command runs here.
    fn root(&self) -> &Path;

    /// Absolute path of the `.git` directory.
    fn git_dir(&self) -> &Path;

    /// Whether tracked files have uncommitted modifications (staged or not).
    fn is_dirty(&self) -> Result<bool, GitError>;

    /// Discard all tracked modifications (`git reset --hard`).
    fn reset_hard(&self) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Refs and branches
    // -----------------------------------------------------------------------

    /// Resolve a revision to a commit id.
    ///
    /// Returns [`GitError::NotFound`] if the spec cannot be resolved.
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError>;

    /// Like [`rev_parse`](Self::rev_parse) but returns `None` when the spec
    /// does not resolve.
    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError>;

    /// Short name of the checked-out branch, `None` when HEAD is detached.
    fn current_branch(&self) -> Result<Option<String>, GitError>;

    /// Whether `refs/heads/<name>` exists.
    fn branch_exists(&self, name: &str) -> Result<bool, GitError>;

    /// Check out an existing branch.
    fn checkout(&self, branch: &str) -> Result<(), GitError>;

    /// Create `branch` at `start` and check it out (`git checkout -b`).
    ///
    /// # Errors
    /// Fails if `branch` already exists; the existing branch is left alone.
    fn checkout_new_branch(&self, branch: &str, start: &str) -> Result<(), GitError>;

    /// Delete a local branch. No-op if it does not exist.
    fn delete_branch(&self, branch: &str, force: bool) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    /// Commits reachable from `rev` that touched `path`, newest first.
    ///
    /// `limit` caps the number of commits returned.
    fn log_path(&self, rev: &str, path: &str, limit: Option<usize>)
    -> Result<Vec<GitOid>, GitError>;

    /// `(commit, root tree)` pairs for every commit reachable from `rev`,
    /// newest first.
    fn log_root_trees(&self, rev: &str) -> Result<Vec<(GitOid, GitOid)>, GitError>;

    /// The `ls-tree` entries naming exactly `path` at `commit`.
    ///
    /// Empty when the path does not exist at that commit.
    fn ls_tree_path(&self, commit: &GitOid, path: &str) -> Result<Vec<TreeEntry>, GitError>;

    /// Count commits in `range`, optionally restricted to `path`.
    fn count_commits(
        &self,
        range: &str,
        path: Option<&str>,
        filter: CommitFilter,
    ) -> Result<usize, GitError>;

    /// Subject lines of the most recent `limit` commits reachable from `rev`.
    fn subjects(&self, rev: &str, limit: usize) -> Result<Vec<String>, GitError>;

    /// `git log --pretty=medium` of `range` restricted to `path`.
    fn log_medium(&self, range: &str, path: &str) -> Result<String, GitError>;

    /// `git log --oneline` of `range`.
    fn log_oneline(&self, range: &str) -> Result<String, GitError>;

    /// `git diff --stat` between two revisions.
    fn diff_stat(&self, from: &str, to: &str) -> Result<String, GitError>;

    // -----------------------------------------------------------------------
    // Remotes
    // -----------------------------------------------------------------------

    /// All refs advertised by `remote` (a configured remote name or URL).
    fn ls_remote(&self, remote: &str) -> Result<Vec<RemoteRef>, GitError>;

    /// Fetch `refs` from `remote` so their objects are available locally.
    fn fetch(&self, remote: &str, refs: &[String]) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Patches
    // -----------------------------------------------------------------------

    /// `git format-patch --stdout` mailbox for `spec.from..spec.to`.
    fn format_patch(&self, spec: &PatchSpec) -> Result<Vec<u8>, GitError>;

    /// Full-index binary diff between `spec.from` and `spec.to`.
    fn diff_patch(&self, spec: &PatchSpec) -> Result<Vec<u8>, GitError>;

    /// Committer identity as `Name <email>` (timestamp stripped).
    fn committer_ident(&self) -> Result<String, GitError>;

    // -----------------------------------------------------------------------
    // Apply and merge
    // -----------------------------------------------------------------------

    /// Apply a mailbox with `git am` onto the checked-out branch.
    fn apply_mailbox(&self, mailbox: &Path, three_way: bool) -> Result<ApplyOutcome, GitError>;

    /// Whether a `git am` session is stopped and waiting for resolution.
    fn apply_in_progress(&self) -> Result<bool, GitError>;

    /// Abort a stopped `git am` session. No-op when none is in progress.
    fn abort_apply(&self) -> Result<(), GitError>;

    /// Merge `branch` into the checked-out branch, always creating a merge
    /// commit with `message`.
    fn merge_no_ff(&self, branch: &str, message: &str) -> Result<(), GitError>;
}

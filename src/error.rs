//! Error types for subsync runs.
//!
//! Defines [`SyncError`], the unified error type for the library. Messages
//! are written for the person at the terminal: each variant says what went
//! wrong and, where there is one, the command that gets them unstuck.
//!
//! An apply conflict is deliberately absent here. It is an expected outcome
//! of a run ([`ApplyOutcome::Conflict`](subsync_git::ApplyOutcome)), not a
//! failure.

use std::path::PathBuf;

use subsync_git::{GitError, GitOid};
use thiserror::Error;

use crate::config::ConfigError;
use crate::workflow_state::{WorkflowPhase, WorkflowStateError};

/// Unified error type for subsync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A manifest line had the wrong number of columns.
    #[error(
        "{source_name}:{line_number}: expected 'remote_name remote_ref local_path [remote_path]', got: {line}"
    )]
    Manifest {
        /// File name, or `<stdin>`.
        source_name: String,
        /// 1-based line number.
        line_number: usize,
        /// The offending line, verbatim.
        line: String,
    },

    /// A manifest contained no definitions at all.
    #[error("no remote definitions found in {sources}")]
    EmptyManifest {
        /// Comma-separated source names.
        sources: String,
    },

    /// The ref pattern matched nothing on the remote.
    #[error("no ref on remote '{remote}' matches '{pattern}'")]
    UnknownRef {
        /// Remote name or URL.
        remote: String,
        /// The manifest's ref pattern.
        pattern: String,
    },

    /// The ref pattern matched more than one ref on the remote.
    #[error("ref pattern '{pattern}' is ambiguous on remote '{remote}': {}", .matches.join(", "))]
    AmbiguousRef {
        /// Remote name or URL.
        remote: String,
        /// The manifest's ref pattern.
        pattern: String,
        /// Every ref that matched.
        matches: Vec<String>,
    },

    /// A literal path lookup returned more than one tree entry.
    #[error("path '{path}' matched {count} entries at {commit}")]
    AmbiguousPath {
        /// Commit inspected.
        commit: GitOid,
        /// The path looked up.
        path: String,
        /// How many entries came back.
        count: usize,
    },

    /// The path never existed on the revision.
    #[error("path '{path}' has no history on {rev}")]
    EmptyHistory {
        /// Revision scanned.
        rev: String,
        /// Path scanned.
        path: String,
    },

    /// No source commit's content matched any destination commit's content.
    #[error(
        "no common ancestor: '{source_path}' on {source_rev} was never identical to '{dest_path}'.\n  To fix: pass --since <commit> naming the last upstream commit already present locally"
    )]
    NoCommonAncestor {
        /// Source revision.
        source_rev: String,
        /// Source path.
        source_path: String,
        /// Destination path.
        dest_path: String,
    },

    /// The checked-out branch does not match what the persisted state expects.
    #[error(
        "expected branch '{expected}' to be checked out, found {}.\n  To fix: check out '{expected}' and retry, or run: subsync --abort",
        .actual.as_deref().map_or_else(|| "a detached HEAD".to_owned(), |b| format!("'{b}'"))
    )]
    BranchState {
        /// Branch the operation requires.
        expected: String,
        /// Branch actually checked out (`None` = detached).
        actual: Option<String>,
    },

    /// The requested operation is not valid in the persisted phase.
    #[error(
        "cannot {operation} while the run is in phase '{phase}'.\n  To fix: run subsync --skip to drop the current remote, or subsync --abort to start over"
    )]
    InvalidPhase {
        /// `continue`, `skip`, ...
        operation: &'static str,
        /// Current phase.
        phase: WorkflowPhase,
    },

    /// A branch the run needs already exists.
    #[error(
        "branch '{branch}' already exists.\n  To fix: delete or rename it, or pick other names under [branches] in .subsync.toml"
    )]
    BranchExists {
        /// The clashing branch.
        branch: String,
    },

    /// A run is already in progress; a new one cannot start.
    #[error(
        "a sync run is already in progress (state in {}).\n  To fix: run subsync --continue, --skip or --abort",
        .state_dir.display()
    )]
    RunInProgress {
        /// The state directory that exists.
        state_dir: PathBuf,
    },

    /// `--continue`/`--skip`/`--abort` was used with no run in progress.
    #[error("no sync run is in progress")]
    NoRunInProgress,

    /// `git am` still has a stopped session.
    #[error(
        "git am is still in progress.\n  To fix: resolve the conflict and run 'git am --continue' (or 'git am --skip'), then subsync --continue"
    )]
    ApplyInProgress,

    /// Tracked files have uncommitted changes.
    #[error("working tree has uncommitted changes.\n  To fix: commit or stash them first")]
    DirtyWorktree,

    /// The run was interrupted and rolled back.
    #[error("interrupted; the run was aborted and the original branch restored")]
    Interrupted,

    /// A git command failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Persisted state could not be read or written.
    #[error(transparent)]
    State(#[from] WorkflowStateError),

    /// `.subsync.toml` could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Other I/O failure (manifest files, scratch patch file).
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(context: impl Into<String>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        context: context.into(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery)]
mod tests {
    use super::*;

    #[test]
    fn manifest_error_names_file_and_line() {
        let err = SyncError::Manifest {
            source_name: "remotes.txt".to_owned(),
            line_number: 3,
            line: "foolib refs/heads/master".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("remotes.txt:3:"));
        assert!(msg.contains("foolib refs/heads/master"));
    }

    #[test]
    fn branch_state_error_mentions_both_branches() {
        let err = SyncError::BranchState {
            expected: "subsync/topic".to_owned(),
            actual: Some("subsync/staging".to_owned()),
        };
        let msg = err.to_string();
        assert!(msg.contains("'subsync/topic'"));
        assert!(msg.contains("'subsync/staging'"));
        assert!(msg.contains("subsync --abort"));
    }

    #[test]
    fn branch_state_error_detached_head() {
        let err = SyncError::BranchState {
            expected: "main".to_owned(),
            actual: None,
        };
        assert!(err.to_string().contains("detached HEAD"));
    }

    #[test]
    fn ambiguous_ref_lists_matches() {
        let err = SyncError::AmbiguousRef {
            remote: "origin".to_owned(),
            pattern: "master".to_owned(),
            matches: vec!["refs/heads/master".to_owned(), "refs/heads/old-master".to_owned()],
        };
        assert!(err.to_string().contains("refs/heads/master, refs/heads/old-master"));
    }

    #[test]
    fn invalid_phase_suggests_skip_and_abort() {
        let msg = SyncError::InvalidPhase {
            operation: "continue",
            phase: WorkflowPhase::Staging,
        }
        .to_string();
        assert!(msg.contains("cannot continue"));
        assert!(msg.contains("subsync --skip"));
        assert!(msg.contains("subsync --abort"));
    }

    #[test]
    fn no_common_ancestor_suggests_since() {
        let err = SyncError::NoCommonAncestor {
            source_rev: "abc".to_owned(),
            source_path: "".to_owned(),
            dest_path: "lib/foo".to_owned(),
        };
        assert!(err.to_string().contains("--since"));
    }
}

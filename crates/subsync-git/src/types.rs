//! Core types for the subsync git layer.
//!
//! These types form the vocabulary shared between the [`GitRepo`](crate::GitRepo)
//! trait and the subsync library. None of them mention process handling;
//! the CLI backend is an implementation detail.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GitOid
// ---------------------------------------------------------------------------

/// A validated lowercase hex git object id (40 chars for SHA-1, 64 for SHA-256).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GitOid(String);

impl GitOid {
    /// Create a new `GitOid`, validating format.
    ///
    /// # Errors
    /// Returns an error if the string is not 40 or 64 lowercase hex characters.
    pub fn new(s: &str) -> Result<Self, OidParseError> {
        Self::validate(s)?;
        Ok(Self(s.to_owned()))
    }

    /// Return the inner hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in human-facing messages.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }

    /// Whether this id starts with the given (case-insensitive) hex prefix.
    ///
    /// An empty prefix never matches.
    #[must_use]
    pub fn has_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.0.starts_with(&prefix.to_ascii_lowercase())
    }

    fn validate(s: &str) -> Result<(), OidParseError> {
        if s.len() != 40 && s.len() != 64 {
            return Err(OidParseError {
                value: s.to_owned(),
                reason: format!("expected 40 or 64 hex characters, got {}", s.len()),
            });
        }
        if !s
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        {
            return Err(OidParseError {
                value: s.to_owned(),
                reason: "must contain only lowercase hex characters (0-9, a-f)".to_owned(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for GitOid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GitOid {
    type Err = OidParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for GitOid {
    type Error = OidParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::validate(&s)?;
        Ok(Self(s))
    }
}

impl From<GitOid> for String {
    fn from(oid: GitOid) -> Self {
        oid.0
    }
}

/// Error from parsing a hex string into a [`GitOid`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OidParseError {
    /// The raw value that failed.
    pub value: String,
    /// Why it failed.
    pub reason: String,
}

impl fmt::Display for OidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid OID {:?}: {}", self.value, self.reason)
    }
}

impl std::error::Error for OidParseError {}

// ---------------------------------------------------------------------------
// ObjectKind / TreeEntry
// ---------------------------------------------------------------------------

/// The type column of `git ls-tree`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// A directory.
    Tree,
    /// A regular file or symlink.
    Blob,
    /// A submodule gitlink.
    Commit,
}

impl ObjectKind {
    /// Whether paths of this kind are directories (rendered with a trailing `/`).
    #[must_use]
    pub const fn is_tree(self) -> bool {
        matches!(self, Self::Tree)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree => write!(f, "tree"),
            Self::Blob => write!(f, "blob"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

impl FromStr for ObjectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tree" => Ok(Self::Tree),
            "blob" => Ok(Self::Blob),
            "commit" => Ok(Self::Commit),
            other => Err(format!("unknown object type '{other}'")),
        }
    }
}

/// One entry from `git ls-tree`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    /// Octal mode string as printed by git (e.g. `"040000"`).
    pub mode: String,
    /// Object type.
    pub kind: ObjectKind,
    /// Object id of the entry's content.
    pub oid: GitOid,
    /// Path of the entry relative to the repository root.
    pub path: String,
}

// ---------------------------------------------------------------------------
// Remote refs
// ---------------------------------------------------------------------------

/// One line of `git ls-remote` output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteRef {
    /// Full ref name (e.g. `refs/heads/main`).
    pub name: String,
    /// The commit the ref points at.
    pub oid: GitOid,
}

// ---------------------------------------------------------------------------
// Commit counting
// ---------------------------------------------------------------------------

/// Which commits [`GitRepo::count_commits`](crate::GitRepo::count_commits) counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitFilter {
    /// Every commit in the range.
    All,
    /// Only commits with two or more parents.
    MergesOnly,
    /// Only commits with at most one parent.
    NoMerges,
}

// ---------------------------------------------------------------------------
// Patch generation
// ---------------------------------------------------------------------------

/// Parameters shared by `format-patch` and `diff` patch generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatchSpec {
    /// Exclusive lower bound.
    pub from: GitOid,
    /// Inclusive upper bound.
    pub to: GitOid,
    /// Pathspec restricting the patch. Empty means the whole tree.
    pub path: String,
    /// Directory passed to `--relative` (with trailing `/`), if any.
    pub relative: Option<String>,
    /// Value for `--src-prefix`.
    pub src_prefix: String,
    /// Value for `--dst-prefix`.
    pub dst_prefix: String,
}

// ---------------------------------------------------------------------------
// Apply outcome
// ---------------------------------------------------------------------------

/// Result of feeding a mailbox to `git am`.
///
/// Hard failures (git missing, corrupt repository) are `Err(GitError)`; a
/// patch that stops on conflicts is an expected outcome, not an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Every patch in the mailbox was committed.
    Applied,
    /// `git am` stopped and left its session in place for manual resolution.
    Conflict {
        /// Git's explanation (stderr + stdout), for display.
        detail: String,
        /// Scratch directory of the stopped session.
        session_dir: PathBuf,
    },
}

impl ApplyOutcome {
    /// Returns `true` for [`ApplyOutcome::Applied`].
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

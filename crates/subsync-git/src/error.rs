//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all [`GitRepo`](crate::GitRepo)
//! trait methods. Callers can match on the failure mode (missing object,
//! failed command, unparsable output) without scraping messages.

use thiserror::Error;

/// Errors returned by [`GitRepo`](crate::GitRepo) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A requested object, ref, or path was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// A git invocation exited with a non-zero status.
    #[error("`{command}` failed{}: {stderr}", .exit_code.map(|c| format!(" (exit {c})")).unwrap_or_default())]
    Command {
        /// The command line that was run (e.g. `"git fetch origin"`).
        command: String,
        /// Captured stderr, trimmed.
        stderr: String,
        /// Exit code, `None` if the process was killed by a signal.
        exit_code: Option<i32>,
    },

    /// An OID string could not be parsed or was otherwise invalid.
    #[error("invalid OID `{value}`: {reason}")]
    InvalidOid {
        /// The raw value that failed validation.
        value: String,
        /// Why validation failed.
        reason: String,
    },

    /// Git produced output this crate could not interpret.
    #[error("unexpected output from `{command}`: {detail}")]
    Parse {
        /// The command whose output was malformed.
        command: String,
        /// What was wrong with it.
        detail: String,
    },

    /// An I/O error occurred (process spawn, scratch files, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::types::OidParseError> for GitError {
    fn from(e: crate::types::OidParseError) -> Self {
        Self::InvalidOid {
            value: e.value,
            reason: e.reason,
        }
    }
}

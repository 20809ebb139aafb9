//! Workflow state machine and the persisted run state.
//!
//! A run is persisted to `<git-dir>/subsync/state.json` as human-readable
//! JSON. Every write goes to a temp file in the same directory, is fsynced,
//! then renamed over the target so an interrupted write never leaves a
//! half-written file.
//!
//! # Lifecycle
//!
//! ```text
//! Initial → Staging ⇄ AmPending
//!              │
//!              └→ Done
//! ```
//!
//! Any non-terminal phase can also transition to `Aborted`.

#![allow(clippy::missing_errors_doc)]

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use subsync_git::GitOid;

use crate::config::Squashing;
use crate::remote::RemoteDefinition;

/// Current on-disk format version of `state.json`.
pub const STATE_VERSION: u32 = 1;

/// Directory (under the git dir) that holds a run's state.
pub const STATE_DIR: &str = "subsync";

const STATE_FILE: &str = "state.json";
const PATCH_FILE: &str = "patch.mbox";

// ---------------------------------------------------------------------------
// WorkflowPhase
// ---------------------------------------------------------------------------

/// The phase of a sync run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPhase {
    /// Definitions resolved, staging branch not yet created.
    Initial,
    /// On the staging branch, processing definitions.
    Staging,
    /// `git am` stopped on a conflict; waiting for the user.
    AmPending,
    /// Run finished.
    Done,
    /// Run rolled back.
    Aborted,
}

impl WorkflowPhase {
    /// Returns `true` for `Done` and `Aborted`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Phases reachable from this one.
    #[must_use]
    pub const fn valid_transitions(self) -> &'static [Self] {
        match self {
            Self::Initial => &[Self::Staging, Self::Aborted],
            Self::Staging => &[Self::AmPending, Self::Done, Self::Aborted],
            Self::AmPending => &[Self::Staging, Self::Aborted],
            Self::Done | Self::Aborted => &[],
        }
    }

    /// Check whether transitioning to `next` is valid.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => write!(f, "initial"),
            Self::Staging => write!(f, "staging"),
            Self::AmPending => write!(f, "am-pending"),
            Self::Done => write!(f, "done"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// Everything a later invocation (`--continue`, `--skip`, `--abort`) needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Format version, see [`STATE_VERSION`].
    pub version: u32,

    /// Current phase.
    pub phase: WorkflowPhase,

    /// Remote definitions, resolved, in manifest order.
    pub definitions: Vec<RemoteDefinition>,

    /// Index of the definition being processed. Equal to
    /// `definitions.len()` once every definition is done.
    pub current_index: usize,

    /// Branch checked out when the run started.
    pub original_branch: String,

    /// HEAD of `original_branch` when the run started.
    pub initial_head: GitOid,

    /// Preview only; never merge staging into the original branch.
    #[serde(default)]
    pub dry_run: bool,

    /// Squashing mode chosen for the run.
    #[serde(default)]
    pub squashing: Squashing,

    /// Explicit anchor prefix, overriding markers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,

    /// Commit count of the patch currently being applied.
    #[serde(default)]
    pub patch_commits: usize,

    /// Unix timestamp (seconds) when the run started.
    pub started_at: u64,

    /// Unix timestamp (seconds) of the last state update.
    pub updated_at: u64,
}

impl WorkflowState {
    /// Create a new state in the `Initial` phase.
    #[must_use]
    pub const fn new(
        definitions: Vec<RemoteDefinition>,
        original_branch: String,
        initial_head: GitOid,
        now: u64,
    ) -> Self {
        Self {
            version: STATE_VERSION,
            phase: WorkflowPhase::Initial,
            definitions,
            current_index: 0,
            original_branch,
            initial_head,
            dry_run: false,
            squashing: Squashing::Auto,
            since: None,
            patch_commits: 0,
            started_at: now,
            updated_at: now,
        }
    }

    /// Move to `next`, updating the timestamp.
    ///
    /// # Errors
    /// Returns [`WorkflowStateError::InvalidTransition`] if the transition is
    /// not allowed.
    pub fn advance(&mut self, next: WorkflowPhase, now: u64) -> Result<(), WorkflowStateError> {
        if !self.phase.can_transition_to(next) {
            return Err(WorkflowStateError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        self.updated_at = now;
        Ok(())
    }

    /// Mark the current definition done.
    pub fn next_definition(&mut self, now: u64) {
        self.current_index = (self.current_index + 1).min(self.definitions.len());
        self.patch_commits = 0;
        self.updated_at = now;
    }

    /// The definition being processed, `None` once all are done.
    #[must_use]
    pub fn current(&self) -> Option<&RemoteDefinition> {
        self.definitions.get(self.current_index)
    }

    /// Whether every definition has been processed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.current_index >= self.definitions.len()
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, WorkflowStateError> {
        serde_json::to_string_pretty(self).map_err(|e| WorkflowStateError::Serialize(e.to_string()))
    }

    /// Deserialize from JSON, rejecting unknown versions and a
    /// `current_index` past the end.
    pub fn from_json(json: &str) -> Result<Self, WorkflowStateError> {
        let state: Self =
            serde_json::from_str(json).map_err(|e| WorkflowStateError::Deserialize(e.to_string()))?;
        if state.version != STATE_VERSION {
            return Err(WorkflowStateError::UnsupportedVersion(state.version));
        }
        if state.current_index > state.definitions.len() {
            return Err(WorkflowStateError::Deserialize(format!(
                "current_index {} exceeds {} definitions",
                state.current_index,
                state.definitions.len()
            )));
        }
        Ok(state)
    }
}

/// Current Unix time in seconds.
#[must_use]
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

// ---------------------------------------------------------------------------
// WorkflowStateStore
// ---------------------------------------------------------------------------

/// The `<git-dir>/subsync/` directory. Its existence is the run lock.
#[derive(Clone, Debug)]
pub struct WorkflowStateStore {
    dir: PathBuf,
}

impl WorkflowStateStore {
    /// Store rooted in `git_dir`.
    #[must_use]
    pub fn new(git_dir: &Path) -> Self {
        Self {
            dir: git_dir.join(STATE_DIR),
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn state_path(&self) -> PathBuf {
        self.dir.join(STATE_FILE)
    }

    /// Scratch mailbox fed to `git am`.
    #[must_use]
    pub fn patch_path(&self) -> PathBuf {
        self.dir.join(PATCH_FILE)
    }

    /// Whether a run is in progress.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.dir.exists()
    }

    /// Load the persisted state. `Ok(None)` when no run is in progress.
    pub fn load(&self) -> Result<Option<WorkflowState>, WorkflowStateError> {
        let path = self.state_path();
        match fs::read_to_string(&path) {
            Ok(contents) => WorkflowState::from_json(&contents).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WorkflowStateError::Io(format!("read {}: {e}", path.display()))),
        }
    }

    /// Persist `state` atomically.
    pub fn save(&self, state: &WorkflowState) -> Result<(), WorkflowStateError> {
        let json = state.to_json()?;
        self.write_atomic(&self.state_path(), json.as_bytes())
    }

    /// Write the scratch patch and return its path.
    pub fn write_patch(&self, bytes: &[u8]) -> Result<PathBuf, WorkflowStateError> {
        let path = self.patch_path();
        self.write_atomic(&path, bytes)?;
        Ok(path)
    }

    /// Remove the whole state directory. Idempotent.
    pub fn clear(&self) -> Result<(), WorkflowStateError> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WorkflowStateError::Io(format!(
                "remove {}: {e}",
                self.dir.display()
            ))),
        }
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), WorkflowStateError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| WorkflowStateError::Io(format!("create {}: {e}", self.dir.display())))?;

        // Same directory as the target, so the rename stays on one filesystem.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| WorkflowStateError::Io(format!("create temp in {}: {e}", self.dir.display())))?;
        tmp.write_all(bytes)
            .map_err(|e| WorkflowStateError::Io(format!("write {}: {e}", tmp.path().display())))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| WorkflowStateError::Io(format!("fsync {}: {e}", tmp.path().display())))?;
        tmp.persist(path).map_err(|e| {
            WorkflowStateError::Io(format!("rename → {}: {}", path.display(), e.error))
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors related to the persisted run state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkflowStateError {
    /// Invalid phase transition.
    InvalidTransition {
        /// The current phase.
        from: WorkflowPhase,
        /// The attempted target phase.
        to: WorkflowPhase,
    },
    /// `state.json` was written by an incompatible version.
    UnsupportedVersion(u32),
    /// Serialization error.
    Serialize(String),
    /// Deserialization error.
    Deserialize(String),
    /// I/O error.
    Io(String),
}

impl fmt::Display for WorkflowStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid workflow phase transition: {from} → {to}")
            }
            Self::UnsupportedVersion(v) => write!(
                f,
                "state file version {v} is not supported (expected {STATE_VERSION}); run subsync --abort"
            ),
            Self::Serialize(msg) => write!(f, "state serialize error: {msg}"),
            Self::Deserialize(msg) => write!(f, "state deserialize error: {msg}"),
            Self::Io(msg) => write!(f, "state I/O error: {msg}"),
        }
    }
}

impl std::error::Error for WorkflowStateError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Per-path object history.
//!
//! For each commit that modified a path, record the id of the tree or blob
//! at that path. Two commits with the same object id have identical content
//! at the path, whatever their history. The matcher relies on this.

use subsync_git::{GitOid, GitRepo, ObjectKind};
use tracing::debug;

use crate::error::SyncError;

/// The object at a path as of one commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitObjectRecord {
    pub commit: GitOid,
    /// Tree or blob id at the path.
    pub object: GitOid,
    pub kind: ObjectKind,
}

/// Scan the history of `path` on `rev`, newest first.
///
/// Stops without error at the first commit where the path no longer exists
/// (it was deleted there), returning what was collected.
///
/// # Errors
/// [`SyncError::EmptyHistory`] if the path has no commits on `rev`,
/// [`SyncError::AmbiguousPath`] if a lookup yields more than one entry.
pub fn scan(repo: &dyn GitRepo, rev: &str, path: &str) -> Result<Vec<CommitObjectRecord>, SyncError> {
    let empty = || SyncError::EmptyHistory {
        rev: rev.to_owned(),
        path: path.to_owned(),
    };

    if path.is_empty() {
        let pairs = repo.log_root_trees(rev)?;
        if pairs.is_empty() {
            return Err(empty());
        }
        return Ok(pairs
            .into_iter()
            .map(|(commit, tree)| CommitObjectRecord {
                commit,
                object: tree,
                kind: ObjectKind::Tree,
            })
            .collect());
    }

    let commits = repo.log_path(rev, path, None)?;
    if commits.is_empty() {
        return Err(empty());
    }

    let mut records = Vec::with_capacity(commits.len());
    for commit in commits {
        let mut entries = repo.ls_tree_path(&commit, path)?;
        match entries.len() {
            0 => {
                debug!(%commit, path, "path deleted here; history stops");
                break;
            }
            1 => {
                let entry = entries.remove(0);
                records.push(CommitObjectRecord {
                    commit,
                    object: entry.oid,
                    kind: entry.kind,
                });
            }
            count => {
                return Err(SyncError::AmbiguousPath {
                    commit,
                    path: path.to_owned(),
                    count,
                });
            }
        }
    }
    debug!(rev, path, records = records.len(), "history scanned");
    Ok(records)
}

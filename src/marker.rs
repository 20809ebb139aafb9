//! Sync marker commits.
//!
//! Every definition merged into staging gets a merge commit whose subject
//! records which upstream commit was applied:
//!
//! ```text
//! Merge <remote_name> <remote_ref> at <sha> (<remote_path> => <local_path>)
//! ```
//!
//! The next run finds the newest such subject for the same definition and
//! uses its sha as the anchor, skipping content matching.

use subsync_git::GitOid;

use crate::patch::display_path;
use crate::remote::RemoteDefinition;

fn prefix(def: &RemoteDefinition) -> String {
    format!("Merge {} {} at ", def.remote_name, def.remote_ref)
}

fn suffix(def: &RemoteDefinition) -> String {
    format!(
        " ({} => {})",
        display_path(&def.remote_path),
        display_path(&def.local_path)
    )
}

/// The marker subject for `def` at upstream commit `sha`.
#[must_use]
pub fn subject(def: &RemoteDefinition, sha: &GitOid) -> String {
    format!("{}{sha}{}", prefix(def), suffix(def))
}

/// Full merge message: subject plus the resolved ref and commit count.
#[must_use]
pub fn message(def: &RemoteDefinition, sha: &GitOid, commits: usize) -> String {
    let mut msg = subject(def, sha);
    msg.push_str("\n\n");
    if let Some(resolved) = &def.resolved_ref {
        msg.push_str(&format!("Ref: {resolved}\n"));
    }
    msg.push_str(&format!("Applied {commits} commit(s)\n"));
    msg
}

/// The sha recorded in `line` if it is a marker for `def`.
#[must_use]
pub fn parse(line: &str, def: &RemoteDefinition) -> Option<GitOid> {
    let middle = line
        .strip_prefix(&prefix(def))?
        .strip_suffix(&suffix(def))?;
    GitOid::new(middle).ok()
}

/// The newest marker for `def` among `subjects` (newest first).
#[must_use]
pub fn find_last(subjects: &[String], def: &RemoteDefinition) -> Option<GitOid> {
    subjects.iter().find_map(|s| parse(s, def))
}

/// Subject of the final merge into the original branch.
#[must_use]
pub fn summary(count: usize) -> String {
    format!("Merge subsync staging: {count} patch(es) to apply")
}

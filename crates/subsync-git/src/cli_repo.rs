//! The git-CLI-backed implementation of [`GitRepo`].

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::debug;

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::{ApplyOutcome, CommitFilter, GitOid, PatchSpec, RemoteRef, TreeEntry};

/// A [`GitRepo`] implementation that runs the `git` binary.
///
/// Every invocation runs with its working directory set to the repository
/// top level, so nothing depends on the caller's current directory.
///
/// Construct via [`CliRepo::open`].
#[derive(Clone, Debug)]
pub struct CliRepo {
    pub(crate) root: PathBuf,
    pub(crate) git_dir: PathBuf,
}

impl CliRepo {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    /// Returns [`GitError::Command`] if `path` is not inside a git working tree.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let toplevel = run_in(path, &["rev-parse", "--show-toplevel"])?;
        let root = PathBuf::from(stdout_line(&toplevel));
        let git_dir = run_in(&root, &["rev-parse", "--absolute-git-dir"])?;
        let git_dir = PathBuf::from(stdout_line(&git_dir));
        debug!(root = %root.display(), git_dir = %git_dir.display(), "opened repository");
        Ok(Self { root, git_dir })
    }

    /// Run git with `args` and fail on a non-zero exit.
    pub(crate) fn run(&self, args: &[&str]) -> Result<Output, GitError> {
        run_in(&self.root, args)
    }

    /// Run git and return its exit status without treating failure as an error.
    pub(crate) fn run_unchecked(&self, args: &[&str]) -> Result<Output, GitError> {
        debug!(?args, "git");
        Ok(Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()?)
    }

    /// Run git and return stdout as a (lossy) string.
    pub(crate) fn stdout(&self, args: &[&str]) -> Result<String, GitError> {
        let output = self.run(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn run_in(dir: &Path, args: &[&str]) -> Result<Output, GitError> {
    debug!(?args, "git");
    let output = Command::new("git").args(args).current_dir(dir).output()?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(command_error(args, &output))
    }
}

pub(crate) fn command_error(args: &[&str], output: &Output) -> GitError {
    GitError::Command {
        command: format!("git {}", args.join(" ")),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        exit_code: output.status.code(),
    }
}

pub(crate) fn stdout_line(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).trim().to_owned()
}

impl GitRepo for CliRepo {
    // === Repository ===
    fn root(&self) -> &Path {
        &self.root
    }

    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn is_dirty(&self) -> Result<bool, GitError> {
        crate::apply_impl::is_dirty(self)
    }

    fn reset_hard(&self) -> Result<(), GitError> {
        crate::apply_impl::reset_hard(self)
    }

    // === Refs ===
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError> {
        crate::refs_impl::rev_parse(self, spec)
    }

    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError> {
        crate::refs_impl::rev_parse_opt(self, spec)
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        crate::refs_impl::current_branch(self)
    }

    fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        crate::refs_impl::branch_exists(self, name)
    }

    fn checkout(&self, branch: &str) -> Result<(), GitError> {
        crate::refs_impl::checkout(self, branch)
    }

    fn checkout_new_branch(&self, branch: &str, start: &str) -> Result<(), GitError> {
        crate::refs_impl::checkout_new_branch(self, branch, start)
    }

    fn delete_branch(&self, branch: &str, force: bool) -> Result<(), GitError> {
        crate::refs_impl::delete_branch(self, branch, force)
    }

    // === History ===
    fn log_path(
        &self,
        rev: &str,
        path: &str,
        limit: Option<usize>,
    ) -> Result<Vec<GitOid>, GitError> {
        crate::history_impl::log_path(self, rev, path, limit)
    }

    fn log_root_trees(&self, rev: &str) -> Result<Vec<(GitOid, GitOid)>, GitError> {
        crate::history_impl::log_root_trees(self, rev)
    }

    fn ls_tree_path(&self, commit: &GitOid, path: &str) -> Result<Vec<TreeEntry>, GitError> {
        crate::history_impl::ls_tree_path(self, commit, path)
    }

    fn count_commits(
        &self,
        range: &str,
        path: Option<&str>,
        filter: CommitFilter,
    ) -> Result<usize, GitError> {
        crate::history_impl::count_commits(self, range, path, filter)
    }

    fn subjects(&self, rev: &str, limit: usize) -> Result<Vec<String>, GitError> {
        crate::history_impl::subjects(self, rev, limit)
    }

    fn log_medium(&self, range: &str, path: &str) -> Result<String, GitError> {
        crate::history_impl::log_medium(self, range, path)
    }

    fn log_oneline(&self, range: &str) -> Result<String, GitError> {
        crate::history_impl::log_oneline(self, range)
    }

    fn diff_stat(&self, from: &str, to: &str) -> Result<String, GitError> {
        crate::patch_impl::diff_stat(self, from, to)
    }

    // === Remotes ===
    fn ls_remote(&self, remote: &str) -> Result<Vec<RemoteRef>, GitError> {
        crate::remote_impl::ls_remote(self, remote)
    }

    fn fetch(&self, remote: &str, refs: &[String]) -> Result<(), GitError> {
        crate::remote_impl::fetch(self, remote, refs)
    }

    // === Patches ===
    fn format_patch(&self, spec: &PatchSpec) -> Result<Vec<u8>, GitError> {
        crate::patch_impl::format_patch(self, spec)
    }

    fn diff_patch(&self, spec: &PatchSpec) -> Result<Vec<u8>, GitError> {
        crate::patch_impl::diff_patch(self, spec)
    }

    fn committer_ident(&self) -> Result<String, GitError> {
        crate::patch_impl::committer_ident(self)
    }

    // === Apply ===
    fn apply_mailbox(&self, mailbox: &Path, three_way: bool) -> Result<ApplyOutcome, GitError> {
        crate::apply_impl::apply_mailbox(self, mailbox, three_way)
    }

    fn apply_in_progress(&self) -> Result<bool, GitError> {
        Ok(crate::apply_impl::apply_in_progress(self))
    }

    fn abort_apply(&self) -> Result<(), GitError> {
        crate::apply_impl::abort_apply(self)
    }

    fn merge_no_ff(&self, branch: &str, message: &str) -> Result<(), GitError> {
        crate::apply_impl::merge_no_ff(self, branch, message)
    }
}

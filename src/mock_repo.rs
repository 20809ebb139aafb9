//! In-memory [`GitRepo`] for unit tests.
//!
//! Answers come from pre-configured maps; every call is recorded so tests
//! can assert how often (and with what) git would have been invoked.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use subsync_git::{
    ApplyOutcome, CommitFilter, GitError, GitOid, GitRepo, ObjectKind, PatchSpec, RemoteRef,
    TreeEntry,
};
use tempfile::TempDir;

/// Oid whose hex spells `n` (zero padded).
pub fn oid(n: u32) -> GitOid {
    GitOid::new(&format!("{n:040x}")).unwrap()
}

pub fn entry(path: &str, object: u32, kind: ObjectKind) -> TreeEntry {
    TreeEntry {
        mode: if kind.is_tree() { "040000" } else { "100644" }.to_owned(),
        kind,
        oid: oid(object),
        path: path.to_owned(),
    }
}

pub struct MockRepo {
    dir: TempDir,
    git_dir: PathBuf,
    pub calls: RefCell<Vec<String>>,
    pub remotes: HashMap<String, Vec<RemoteRef>>,
    /// `(rev, path)` → commits touching the path, newest first.
    pub path_logs: HashMap<(String, String), Vec<GitOid>>,
    pub root_trees: HashMap<String, Vec<(GitOid, GitOid)>>,
    /// `(commit, path)` → ls-tree entries.
    pub trees: HashMap<(GitOid, String), Vec<TreeEntry>>,
    /// Range → commit count.
    pub counts: HashMap<String, usize>,
    pub branch: RefCell<Option<String>>,
    pub branches: RefCell<Vec<String>>,
    /// Method that fails when called; raises `interrupt` first, if set.
    pub fail_on: Option<&'static str>,
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl MockRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let git_dir = dir.path().join(".git");
        std::fs::create_dir_all(&git_dir).unwrap();
        Self {
            dir,
            git_dir,
            calls: RefCell::new(Vec::new()),
            remotes: HashMap::new(),
            path_logs: HashMap::new(),
            root_trees: HashMap::new(),
            trees: HashMap::new(),
            counts: HashMap::new(),
            branch: RefCell::new(Some("main".to_owned())),
            branches: RefCell::new(vec!["main".to_owned()]),
            fail_on: None,
            interrupt: None,
        }
    }

    /// Number of recorded calls starting with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn has_branch(&self, name: &str) -> bool {
        self.branches.borrow().iter().any(|b| b == name)
    }

    fn call(&self, name: &'static str, detail: String) -> Result<(), GitError> {
        let line = if detail.is_empty() {
            name.to_owned()
        } else {
            format!("{name}:{detail}")
        };
        self.calls.borrow_mut().push(line);
        if self.fail_on == Some(name) {
            if let Some(flag) = &self.interrupt {
                flag.store(true, Ordering::SeqCst);
            }
            return Err(GitError::Command {
                command: format!("git {name}"),
                stderr: "killed".to_owned(),
                exit_code: None,
            });
        }
        Ok(())
    }
}

impl GitRepo for MockRepo {
    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn is_dirty(&self) -> Result<bool, GitError> {
        self.call("is_dirty", String::new())?;
        Ok(false)
    }

    fn reset_hard(&self) -> Result<(), GitError> {
        self.call("reset_hard", String::new())
    }

    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError> {
        self.rev_parse_opt(spec)?.ok_or_else(|| GitError::NotFound {
            message: spec.to_owned(),
        })
    }

    fn rev_parse_opt(&self, spec: &str) -> Result<Option<GitOid>, GitError> {
        self.call("rev_parse", spec.to_owned())?;
        Ok(Some(oid(0xaaaa)))
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        Ok(self.branch.borrow().clone())
    }

    fn branch_exists(&self, name: &str) -> Result<bool, GitError> {
        Ok(self.has_branch(name))
    }

    fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.call("checkout", branch.to_owned())?;
        *self.branch.borrow_mut() = Some(branch.to_owned());
        Ok(())
    }

    fn checkout_new_branch(&self, branch: &str, start: &str) -> Result<(), GitError> {
        self.call("checkout_new_branch", format!("{branch}@{start}"))?;
        if self.has_branch(branch) {
            return Err(GitError::Command {
                command: format!("git checkout -b {branch}"),
                stderr: "already exists".to_owned(),
                exit_code: Some(128),
            });
        }
        self.branches.borrow_mut().push(branch.to_owned());
        *self.branch.borrow_mut() = Some(branch.to_owned());
        Ok(())
    }

    fn delete_branch(&self, branch: &str, _force: bool) -> Result<(), GitError> {
        self.call("delete_branch", branch.to_owned())?;
        self.branches.borrow_mut().retain(|b| b != branch);
        Ok(())
    }

    fn log_path(
        &self,
        rev: &str,
        path: &str,
        limit: Option<usize>,
    ) -> Result<Vec<GitOid>, GitError> {
        self.call("log_path", format!("{rev}:{path}"))?;
        let mut commits = self
            .path_logs
            .get(&(rev.to_owned(), path.to_owned()))
            .cloned()
            .unwrap_or_default();
        if let Some(limit) = limit {
            commits.truncate(limit);
        }
        Ok(commits)
    }

    fn log_root_trees(&self, rev: &str) -> Result<Vec<(GitOid, GitOid)>, GitError> {
        self.call("log_root_trees", rev.to_owned())?;
        Ok(self.root_trees.get(rev).cloned().unwrap_or_default())
    }

    fn ls_tree_path(&self, commit: &GitOid, path: &str) -> Result<Vec<TreeEntry>, GitError> {
        self.call("ls_tree_path", format!("{}:{path}", commit.short()))?;
        Ok(self
            .trees
            .get(&(commit.clone(), path.to_owned()))
            .cloned()
            .unwrap_or_default())
    }

    fn count_commits(
        &self,
        range: &str,
        _path: Option<&str>,
        _filter: CommitFilter,
    ) -> Result<usize, GitError> {
        self.call("count_commits", range.to_owned())?;
        Ok(self.counts.get(range).copied().unwrap_or(0))
    }

    fn subjects(&self, _rev: &str, _limit: usize) -> Result<Vec<String>, GitError> {
        Ok(Vec::new())
    }

    fn log_medium(&self, _range: &str, _path: &str) -> Result<String, GitError> {
        Ok(String::new())
    }

    fn log_oneline(&self, _range: &str) -> Result<String, GitError> {
        Ok(String::new())
    }

    fn diff_stat(&self, _from: &str, _to: &str) -> Result<String, GitError> {
        Ok(String::new())
    }

    fn ls_remote(&self, remote: &str) -> Result<Vec<RemoteRef>, GitError> {
        self.call("ls_remote", remote.to_owned())?;
        self.remotes
            .get(remote)
            .cloned()
            .ok_or_else(|| GitError::NotFound {
                message: format!("remote {remote}"),
            })
    }

    fn fetch(&self, remote: &str, refs: &[String]) -> Result<(), GitError> {
        self.call("fetch", format!("{remote}:{}", refs.join(",")))
    }

    fn format_patch(&self, _spec: &PatchSpec) -> Result<Vec<u8>, GitError> {
        self.call("format_patch", String::new())?;
        Ok(Vec::new())
    }

    fn diff_patch(&self, _spec: &PatchSpec) -> Result<Vec<u8>, GitError> {
        self.call("diff_patch", String::new())?;
        Ok(Vec::new())
    }

    fn committer_ident(&self) -> Result<String, GitError> {
        Ok("Test User <test@example.com>".to_owned())
    }

    fn apply_mailbox(&self, _mailbox: &Path, _three_way: bool) -> Result<ApplyOutcome, GitError> {
        self.call("apply_mailbox", String::new())?;
        Ok(ApplyOutcome::Applied)
    }

    fn apply_in_progress(&self) -> Result<bool, GitError> {
        Ok(false)
    }

    fn abort_apply(&self) -> Result<(), GitError> {
        self.call("abort_apply", String::new())
    }

    fn merge_no_ff(&self, branch: &str, _message: &str) -> Result<(), GitError> {
        self.call("merge_no_ff", branch.to_owned())
    }
}

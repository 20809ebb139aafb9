//! Log, rev-list and ls-tree queries.

use crate::cli_repo::CliRepo;
use crate::error::GitError;
use crate::types::{CommitFilter, GitOid, ObjectKind, TreeEntry};

fn with_path<'a>(mut args: Vec<&'a str>, path: &'a str) -> Vec<&'a str> {
    if !path.is_empty() {
        args.push("--");
        args.push(path);
    }
    args
}

pub fn log_path(
    repo: &CliRepo,
    rev: &str,
    path: &str,
    limit: Option<usize>,
) -> Result<Vec<GitOid>, GitError> {
    let max = limit.map(|n| format!("--max-count={n}"));
    let mut args = vec!["log", "--format=%H"];
    if let Some(max) = &max {
        args.push(max);
    }
    args.push(rev);
    let args = with_path(args, path);
    let out = repo.stdout(&args)?;
    out.lines()
        .filter(|l| !l.is_empty())
        .map(|l| GitOid::new(l.trim()).map_err(GitError::from))
        .collect()
}

pub fn log_root_trees(repo: &CliRepo, rev: &str) -> Result<Vec<(GitOid, GitOid)>, GitError> {
    let out = repo.stdout(&["log", "--format=%H %T", rev])?;
    out.lines()
        .filter(|l| !l.is_empty())
        .map(|line| {
            let (commit, tree) = line.split_once(' ').ok_or_else(|| GitError::Parse {
                command: format!("git log --format=%H %T {rev}"),
                detail: format!("expected '<commit> <tree>', got '{line}'"),
            })?;
            Ok((GitOid::new(commit)?, GitOid::new(tree.trim())?))
        })
        .collect()
}

pub fn ls_tree_path(repo: &CliRepo, commit: &GitOid, path: &str) -> Result<Vec<TreeEntry>, GitError> {
    let output = repo.run(&["ls-tree", "-z", commit.as_str(), "--", path])?;
    parse_ls_tree(&String::from_utf8_lossy(&output.stdout))
}

/// Parse NUL-terminated `git ls-tree -z` records.
pub(crate) fn parse_ls_tree(raw: &str) -> Result<Vec<TreeEntry>, GitError> {
    let parse_err = |detail: String| GitError::Parse {
        command: "git ls-tree -z".to_owned(),
        detail,
    };
    raw.split('\0')
        .filter(|rec| !rec.is_empty())
        .map(|rec| {
            let (meta, path) = rec
                .split_once('\t')
                .ok_or_else(|| parse_err(format!("missing tab in '{rec}'")))?;
            let mut fields = meta.split(' ');
            let (Some(mode), Some(kind), Some(oid)) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(parse_err(format!("expected 3 fields in '{meta}'")));
            };
            Ok(TreeEntry {
                mode: mode.to_owned(),
                kind: kind.parse::<ObjectKind>().map_err(parse_err)?,
                oid: GitOid::new(oid)?,
                path: path.to_owned(),
            })
        })
        .collect()
}

pub fn count_commits(
    repo: &CliRepo,
    range: &str,
    path: Option<&str>,
    filter: CommitFilter,
) -> Result<usize, GitError> {
    let mut args = vec!["rev-list", "--count"];
    match filter {
        CommitFilter::All => {}
        CommitFilter::MergesOnly => args.push("--min-parents=2"),
        CommitFilter::NoMerges => args.push("--no-merges"),
    }
    args.push(range);
    let args = with_path(args, path.unwrap_or(""));
    let out = repo.stdout(&args)?;
    out.trim().parse().map_err(|e| GitError::Parse {
        command: format!("git {}", args.join(" ")),
        detail: format!("expected a count, got '{}': {e}", out.trim()),
    })
}

pub fn subjects(repo: &CliRepo, rev: &str, limit: usize) -> Result<Vec<String>, GitError> {
    let max = format!("--max-count={limit}");
    let out = repo.stdout(&["log", &max, "--format=%s", rev])?;
    Ok(out.lines().map(str::to_owned).collect())
}

pub fn log_medium(repo: &CliRepo, range: &str, path: &str) -> Result<String, GitError> {
    let args = with_path(vec!["log", "--pretty=medium", "--no-decorate", range], path);
    repo.stdout(&args)
}

pub fn log_oneline(repo: &CliRepo, range: &str) -> Result<String, GitError> {
    repo.stdout(&["log", "--oneline", "--no-decorate", range])
}

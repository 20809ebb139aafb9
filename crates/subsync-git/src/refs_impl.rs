//! Rev-parse and branch operations.

use crate::cli_repo::{CliRepo, command_error, stdout_line};
use crate::error::GitError;
use crate::types::GitOid;

pub fn rev_parse(repo: &CliRepo, spec: &str) -> Result<GitOid, GitError> {
    rev_parse_opt(repo, spec)?.ok_or_else(|| GitError::NotFound {
        message: format!("revision '{spec}' does not resolve to a commit"),
    })
}

pub fn rev_parse_opt(repo: &CliRepo, spec: &str) -> Result<Option<GitOid>, GitError> {
    let peeled = format!("{spec}^{{commit}}");
    let output = repo.run_unchecked(&["rev-parse", "--verify", "--quiet", &peeled])?;
    if !output.status.success() {
        return Ok(None);
    }
    Ok(Some(GitOid::new(&stdout_line(&output))?))
}

pub fn current_branch(repo: &CliRepo) -> Result<Option<String>, GitError> {
    let args = ["symbolic-ref", "--quiet", "--short", "HEAD"];
    let output = repo.run_unchecked(&args)?;
    match output.status.code() {
        Some(0) => Ok(Some(stdout_line(&output))),
        // Exit 1 with --quiet means HEAD is detached.
        Some(1) => Ok(None),
        _ => Err(command_error(&args, &output)),
    }
}

pub fn branch_exists(repo: &CliRepo, name: &str) -> Result<bool, GitError> {
    let full = format!("refs/heads/{name}");
    let output = repo.run_unchecked(&["rev-parse", "--verify", "--quiet", &full])?;
    Ok(output.status.success())
}

pub fn checkout(repo: &CliRepo, branch: &str) -> Result<(), GitError> {
    repo.run(&["checkout", "--quiet", branch])?;
    Ok(())
}

pub fn checkout_new_branch(repo: &CliRepo, branch: &str, start: &str) -> Result<(), GitError> {
    repo.run(&["checkout", "--quiet", "-b", branch, start])?;
    Ok(())
}

pub fn delete_branch(repo: &CliRepo, branch: &str, force: bool) -> Result<(), GitError> {
    if !branch_exists(repo, branch)? {
        return Ok(());
    }
    let flag = if force { "-D" } else { "-d" };
    repo.run(&["branch", "--quiet", flag, branch])?;
    Ok(())
}

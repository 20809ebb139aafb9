//! `git am`, merge, and working-tree state.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cli_repo::{CliRepo, command_error};
use crate::error::GitError;
use crate::types::ApplyOutcome;

pub fn is_dirty(repo: &CliRepo) -> Result<bool, GitError> {
    let out = repo.stdout(&["status", "--porcelain", "--untracked-files=no"])?;
    Ok(!out.trim().is_empty())
}

pub fn reset_hard(repo: &CliRepo) -> Result<(), GitError> {
    repo.run(&["reset", "--hard", "--quiet"])?;
    Ok(())
}

/// Directory git uses for a stopped `am` session.
fn session_dir(repo: &CliRepo) -> PathBuf {
    repo.git_dir.join("rebase-apply")
}

pub fn apply_in_progress(repo: &CliRepo) -> bool {
    // `rebase-apply/applying` distinguishes `git am` from an old-style rebase.
    session_dir(repo).join("applying").exists()
}

pub fn apply_mailbox(
    repo: &CliRepo,
    mailbox: &Path,
    three_way: bool,
) -> Result<ApplyOutcome, GitError> {
    let mailbox = mailbox.to_string_lossy();
    let mut args = vec!["am"];
    if three_way {
        args.push("--3way");
    }
    args.push(&mailbox);

    let output = repo.run_unchecked(&args)?;
    if output.status.success() {
        debug!(mailbox = %mailbox, "mailbox applied");
        return Ok(ApplyOutcome::Applied);
    }
    if apply_in_progress(repo) {
        let detail = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout).trim(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        warn!(mailbox = %mailbox, "git am stopped on a conflict");
        return Ok(ApplyOutcome::Conflict {
            detail: detail.trim().to_owned(),
            session_dir: session_dir(repo),
        });
    }
    Err(command_error(&args, &output))
}

pub fn abort_apply(repo: &CliRepo) -> Result<(), GitError> {
    if apply_in_progress(repo) {
        repo.run(&["am", "--abort"])?;
    }
    Ok(())
}

pub fn merge_no_ff(repo: &CliRepo, branch: &str, message: &str) -> Result<(), GitError> {
    repo.run(&["merge", "--quiet", "--no-ff", "--no-edit", "-m", message, branch])?;
    Ok(())
}

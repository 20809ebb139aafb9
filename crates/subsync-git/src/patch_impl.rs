//! Patch text generation: `format-patch`, `diff`, and identity lookup.

use crate::cli_repo::CliRepo;
use crate::error::GitError;
use crate::types::PatchSpec;

/// Options shared by `format-patch` and `diff` so both emit the same path
/// layout and full blob ids (needed for `am --3way`).
fn common_args(spec: &PatchSpec) -> Vec<String> {
    let mut args = vec![
        "--full-index".to_owned(),
        "--binary".to_owned(),
        "--no-color".to_owned(),
        "--no-ext-diff".to_owned(),
        format!("--src-prefix={}", spec.src_prefix),
        format!("--dst-prefix={}", spec.dst_prefix),
    ];
    if let Some(relative) = &spec.relative {
        args.push(format!("--relative={relative}"));
    }
    args
}

fn push_pathspec(args: &mut Vec<String>, spec: &PatchSpec) {
    if !spec.path.is_empty() {
        args.push("--".to_owned());
        args.push(spec.path.clone());
    }
}

pub fn format_patch(repo: &CliRepo, spec: &PatchSpec) -> Result<Vec<u8>, GitError> {
    let mut args = vec![
        "format-patch".to_owned(),
        "--stdout".to_owned(),
        "--no-stat".to_owned(),
    ];
    args.extend(common_args(spec));
    args.push(format!("{}..{}", spec.from, spec.to));
    push_pathspec(&mut args, spec);
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    Ok(repo.run(&refs)?.stdout)
}

pub fn diff_patch(repo: &CliRepo, spec: &PatchSpec) -> Result<Vec<u8>, GitError> {
    let mut args = vec!["diff".to_owned()];
    args.extend(common_args(spec));
    args.push(spec.from.to_string());
    args.push(spec.to.to_string());
    push_pathspec(&mut args, spec);
    let refs: Vec<&str> = args.iter().map(String::as_str).collect();
    Ok(repo.run(&refs)?.stdout)
}

pub fn diff_stat(repo: &CliRepo, from: &str, to: &str) -> Result<String, GitError> {
    repo.stdout(&["diff", "--stat", "--no-color", from, to])
}

pub fn committer_ident(repo: &CliRepo) -> Result<String, GitError> {
    let raw = repo.stdout(&["var", "GIT_COMMITTER_IDENT"])?;
    strip_ident_timestamp(raw.trim()).ok_or_else(|| GitError::Parse {
        command: "git var GIT_COMMITTER_IDENT".to_owned(),
        detail: format!("no '<email>' in '{}'", raw.trim()),
    })
}

/// `Name <email> 1700000000 +0000` → `Name <email>`.
pub(crate) fn strip_ident_timestamp(ident: &str) -> Option<String> {
    let end = ident.rfind('>')?;
    Some(ident[..=end].to_owned())
}

//! Remote queries via `git ls-remote` and `git fetch`.

use crate::cli_repo::CliRepo;
use crate::error::GitError;
use crate::types::{GitOid, RemoteRef};

pub fn ls_remote(repo: &CliRepo, remote: &str) -> Result<Vec<RemoteRef>, GitError> {
    let out = repo.stdout(&["ls-remote", remote])?;
    parse_ls_remote(&out, remote)
}

/// Parse `<oid>\t<ref>` lines.
///
/// An annotated tag is listed twice: once with the tag object id and once,
/// suffixed `^{}`, with the commit it points at. The commit id wins.
pub(crate) fn parse_ls_remote(raw: &str, remote: &str) -> Result<Vec<RemoteRef>, GitError> {
    let mut refs: Vec<RemoteRef> = Vec::new();
    for line in raw.lines().filter(|l| !l.is_empty()) {
        let (oid, name) = line.split_once('\t').ok_or_else(|| GitError::Parse {
            command: format!("git ls-remote {remote}"),
            detail: format!("expected '<oid>\\t<ref>', got '{line}'"),
        })?;
        let oid = GitOid::new(oid)?;
        match name.strip_suffix("^{}") {
            Some(tag) => match refs.iter_mut().find(|r| r.name == tag) {
                Some(entry) => entry.oid = oid,
                None => refs.push(RemoteRef {
                    name: tag.to_owned(),
                    oid,
                }),
            },
            None => refs.push(RemoteRef {
                name: name.to_owned(),
                oid,
            }),
        }
    }
    Ok(refs)
}

pub fn fetch(repo: &CliRepo, remote: &str, refs: &[String]) -> Result<(), GitError> {
    let mut args = vec!["fetch", "--quiet", "--no-tags", remote];
    args.extend(refs.iter().map(String::as_str));
    repo.run(&args)?;
    Ok(())
}

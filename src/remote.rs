//! Remote definitions and their resolution against `git ls-remote`.
//!
//! A [`RemoteDefinition`] comes from one manifest line. The
//! [`RemoteResolver`] turns its ref pattern into a concrete ref and commit,
//! fetches it, and finds the last commit that touched the remote path. Ref
//! listings and fetches are cached per remote name for the life of the
//! resolver, so each remote is listed and fetched at most once per run.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use subsync_git::{GitOid, GitRepo, RemoteRef};
use tracing::{debug, info};

use crate::error::SyncError;
use crate::patch::normalize_path;

/// One upstream path to track.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDefinition {
    /// Configured remote name or URL.
    pub remote_name: String,
    /// Ref pattern, matched by substring against the remote's refs.
    pub remote_ref: String,
    /// Normalized local path (`""` = repository root).
    pub local_path: String,
    /// Normalized upstream path (`""` = repository root).
    pub remote_path: String,
    /// Full ref name the pattern resolved to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_ref: Option<String>,
    /// Commit the resolved ref points at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_ref_head: Option<GitOid>,
    /// Last commit on `resolved_ref_head` that touched `remote_path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_path_head: Option<GitOid>,
}

impl RemoteDefinition {
    /// New unresolved definition. Paths are normalized.
    #[must_use]
    pub fn new(remote_name: &str, remote_ref: &str, local_path: &str, remote_path: &str) -> Self {
        Self {
            remote_name: remote_name.to_owned(),
            remote_ref: remote_ref.to_owned(),
            local_path: normalize_path(local_path),
            remote_path: normalize_path(remote_path),
            resolved_ref: None,
            resolved_ref_head: None,
            resolved_path_head: None,
        }
    }
}

/// Pick the single ref whose name contains `pattern`.
///
/// # Errors
/// [`SyncError::UnknownRef`] on no match, [`SyncError::AmbiguousRef`] on
/// more than one.
pub fn match_ref<'a>(
    remote: &str,
    refs: &'a [RemoteRef],
    pattern: &str,
) -> Result<&'a RemoteRef, SyncError> {
    let matches: Vec<&RemoteRef> = refs.iter().filter(|r| r.name.contains(pattern)).collect();
    match matches.as_slice() {
        [] => Err(SyncError::UnknownRef {
            remote: remote.to_owned(),
            pattern: pattern.to_owned(),
        }),
        [only] => Ok(only),
        many => Err(SyncError::AmbiguousRef {
            remote: remote.to_owned(),
            pattern: pattern.to_owned(),
            matches: many.iter().map(|r| r.name.clone()).collect(),
        }),
    }
}

/// Run-scoped cache of ref listings and completed fetches.
#[derive(Debug, Default)]
pub struct RemoteResolver {
    ref_listings: HashMap<String, Vec<RemoteRef>>,
    fetched: HashSet<String>,
}

impl RemoteResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn listing(&mut self, repo: &dyn GitRepo, remote: &str) -> Result<&[RemoteRef], SyncError> {
        if !self.ref_listings.contains_key(remote) {
            info!(remote, "listing remote refs");
            let refs = repo.ls_remote(remote)?;
            self.ref_listings.insert(remote.to_owned(), refs);
        }
        Ok(self
            .ref_listings
            .get(remote)
            .map_or(&[][..], Vec::as_slice))
    }

    /// Resolve the ref pattern of `def` (no fetch) and return the ref's commit.
    fn resolve_ref(
        &mut self,
        repo: &dyn GitRepo,
        def: &mut RemoteDefinition,
    ) -> Result<GitOid, SyncError> {
        if let Some(head) = &def.resolved_ref_head {
            return Ok(head.clone());
        }
        let refs = self.listing(repo, &def.remote_name)?;
        let found = match_ref(&def.remote_name, refs, &def.remote_ref)?.clone();
        debug!(remote = %def.remote_name, pattern = %def.remote_ref, resolved = %found.name, "ref resolved");
        def.resolved_ref = Some(found.name);
        def.resolved_ref_head = Some(found.oid.clone());
        Ok(found.oid)
    }

    fn ensure_fetched(
        &mut self,
        repo: &dyn GitRepo,
        remote: &str,
        refs: &[String],
    ) -> Result<(), SyncError> {
        if self.fetched.contains(remote) {
            return Ok(());
        }
        info!(remote, ?refs, "fetching");
        repo.fetch(remote, refs)?;
        self.fetched.insert(remote.to_owned());
        Ok(())
    }

    fn resolve_path_head(
        repo: &dyn GitRepo,
        def: &mut RemoteDefinition,
        head: GitOid,
    ) -> Result<GitOid, SyncError> {
        if let Some(path_head) = &def.resolved_path_head {
            return Ok(path_head.clone());
        }
        let path_head = if def.remote_path.is_empty() {
            head
        } else {
            repo.log_path(head.as_str(), &def.remote_path, Some(1))?
                .into_iter()
                .next()
                .ok_or_else(|| SyncError::EmptyHistory {
                    rev: def.resolved_ref.clone().unwrap_or_else(|| head.to_string()),
                    path: def.remote_path.clone(),
                })?
        };
        def.resolved_path_head = Some(path_head.clone());
        Ok(path_head)
    }

    /// Fully resolve one definition and return its path head. No git calls
    /// when already resolved.
    ///
    /// # Errors
    /// Ref matching, fetch, and history failures.
    pub fn resolve(
        &mut self,
        repo: &dyn GitRepo,
        def: &mut RemoteDefinition,
    ) -> Result<GitOid, SyncError> {
        if let Some(path_head) = &def.resolved_path_head {
            return Ok(path_head.clone());
        }
        let head = self.resolve_ref(repo, def)?;
        let refs: Vec<String> = def.resolved_ref.iter().cloned().collect();
        self.ensure_fetched(repo, &def.remote_name, &refs)?;
        Self::resolve_path_head(repo, def, head)
    }

    /// Resolve every definition: all refs first, then one fetch per remote
    /// carrying every ref resolved for it, then the path heads.
    ///
    /// # Errors
    /// The first ref, fetch, or history failure.
    pub fn resolve_all(
        &mut self,
        repo: &dyn GitRepo,
        defs: &mut [RemoteDefinition],
    ) -> Result<(), SyncError> {
        let mut heads = Vec::with_capacity(defs.len());
        for def in defs.iter_mut() {
            heads.push(self.resolve_ref(repo, def)?);
        }

        let mut per_remote: Vec<(String, Vec<String>)> = Vec::new();
        for def in defs.iter() {
            let Some(name) = def.resolved_ref.clone() else {
                continue;
            };
            match per_remote.iter_mut().find(|(r, _)| *r == def.remote_name) {
                Some((_, refs)) if !refs.contains(&name) => refs.push(name),
                Some(_) => {}
                None => per_remote.push((def.remote_name.clone(), vec![name])),
            }
        }
        for (remote, refs) in &per_remote {
            self.ensure_fetched(repo, remote, refs)?;
        }

        for (def, head) in defs.iter_mut().zip(heads) {
            Self::resolve_path_head(repo, def, head)?;
        }
        Ok(())
    }
}

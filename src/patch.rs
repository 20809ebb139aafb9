//! Patch assembly: turn a pending upstream range into a mailbox `git am`
//! can apply at the local path.
//!
//! Git generates paths relative to the source directory with a placeholder
//! prefix; [`PathTranslation`] then swaps the placeholder for the local
//! path. Squashed patches are a synthetic single-message mailbox built
//! around `git diff`.

use subsync_git::{CommitFilter, GitOid, GitRepo, ObjectKind, PatchSpec};
use tracing::{debug, info};

use crate::config::Squashing;
use crate::error::SyncError;

/// Placeholder prefix inserted by git and replaced afterwards.
const PLACEHOLDER: &str = "__subsync_path__";

/// Date line git itself uses for `format-patch` mbox separators.
const MBOX_DATE: &str = "Mon Sep 17 00:00:00 2001";

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Normalize a repository path.
///
/// Leading `/` and `./` are stripped, empty and `.` components dropped, and
/// the trailing `/` removed. `"/"`, `""` and `"."` all become `""` (root).
#[must_use]
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Path as shown to users: root is `/`.
#[must_use]
pub fn display_path(path: &str) -> &str {
    if path.is_empty() { "/" } else { path }
}

/// Split `dir/leaf` into (`Some("dir")`, `"leaf"`).
fn split_parent(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('/') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, path),
    }
}

/// Rewrites the paths in a generated patch from the source layout to the
/// destination layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathTranslation {
    /// `--relative` argument (source directory with trailing `/`).
    relative: Option<String>,
    /// Bytes git emits after the prefix, to be replaced.
    needle: String,
    /// Replacement for `needle`.
    replacement: String,
}

impl PathTranslation {
    /// Translation from `source_path` (an object of `kind`) to `dest_path`.
    ///
    /// Both paths must already be normalized.
    #[must_use]
    pub fn new(source_path: &str, dest_path: &str, kind: ObjectKind) -> Self {
        if kind.is_tree() {
            let relative = (!source_path.is_empty()).then(|| format!("{source_path}/"));
            let replacement = if dest_path.is_empty() {
                String::new()
            } else {
                format!("{dest_path}/")
            };
            Self {
                relative,
                needle: PLACEHOLDER.to_owned(),
                replacement,
            }
        } else {
            // Blob (or gitlink): git prints the leaf name after the prefix.
            let (parent, leaf) = split_parent(source_path);
            Self {
                relative: parent.map(|p| format!("{p}/")),
                needle: format!("{PLACEHOLDER}{leaf}"),
                replacement: dest_path.to_owned(),
            }
        }
    }

    /// Git invocation parameters for `from..to` restricted to `source_path`.
    #[must_use]
    pub fn spec(&self, from: &GitOid, to: &GitOid, source_path: &str) -> PatchSpec {
        PatchSpec {
            from: from.clone(),
            to: to.clone(),
            path: source_path.to_owned(),
            relative: self.relative.clone(),
            src_prefix: format!("a/{PLACEHOLDER}"),
            dst_prefix: format!("b/{PLACEHOLDER}"),
        }
    }

    /// Replace every placeholder occurrence in `patch`.
    #[must_use]
    pub fn apply(&self, patch: &[u8]) -> Vec<u8> {
        replace_all(patch, self.needle.as_bytes(), self.replacement.as_bytes())
    }
}

fn replace_all(haystack: &[u8], needle: &[u8], with: &[u8]) -> Vec<u8> {
    if needle.is_empty() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(pos) = rest.windows(needle.len()).position(|w| w == needle) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(with);
        rest = &rest[pos + needle.len()..];
    }
    out.extend_from_slice(rest);
    out
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Decide whether to squash, given how many merge commits the range holds.
#[must_use]
pub const fn should_squash(mode: Squashing, merge_commits: usize) -> bool {
    match mode {
        Squashing::Never => false,
        Squashing::Always => true,
        Squashing::Auto => merge_commits > 0,
    }
}

/// An assembled patch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Patch {
    /// Nothing to apply.
    Empty,
    /// A mailbox ready for `git am`.
    Mailbox {
        /// Raw mbox bytes.
        bytes: Vec<u8>,
        /// Number of upstream commits the mailbox covers.
        commits: usize,
        /// Whether the range was collapsed into one message.
        squashed: bool,
    },
}

/// Inputs for [`assemble`].
#[derive(Clone, Debug)]
pub struct PatchRequest<'a> {
    /// Last upstream commit already present locally.
    pub anchor: &'a GitOid,
    /// Upstream commit to bring the local path up to.
    pub source_rev: &'a GitOid,
    /// Normalized upstream path.
    pub source_path: &'a str,
    /// Whether the upstream path is a tree or a file.
    pub source_kind: ObjectKind,
    /// Normalized local path.
    pub dest_path: &'a str,
    /// Number of pending upstream commits.
    pub pending: usize,
    pub squashing: Squashing,
}

/// Build the mailbox for `request`.
///
/// # Errors
/// Propagates git failures.
pub fn assemble(repo: &dyn GitRepo, request: &PatchRequest<'_>) -> Result<Patch, SyncError> {
    if request.pending == 0 {
        return Ok(Patch::Empty);
    }

    let range = format!("{}..{}", request.anchor, request.source_rev);
    let merges = repo.count_commits(
        &range,
        Some(request.source_path),
        CommitFilter::MergesOnly,
    )?;
    let squash = should_squash(request.squashing, merges);
    debug!(%range, merges, squash, "assembling patch");

    let translation =
        PathTranslation::new(request.source_path, request.dest_path, request.source_kind);
    let spec = translation.spec(request.anchor, request.source_rev, request.source_path);

    let raw = if squash {
        let diff = repo.diff_patch(&spec)?;
        if diff.is_empty() {
            info!(%range, "squashed diff is empty");
            return Ok(Patch::Empty);
        }
        let header = SquashHeader {
            ident: repo.committer_ident()?,
            anchor: request.anchor,
            source_rev: request.source_rev,
            commits: request.pending,
            source_path: request.source_path,
            dest_path: request.dest_path,
            log: repo.log_medium(&range, request.source_path)?,
        };
        let mut bytes = header.render().into_bytes();
        bytes.extend_from_slice(&diff);
        bytes
    } else {
        repo.format_patch(&spec)?
    };

    if raw.is_empty() {
        // format-patch skips merges; a range of only merges yields nothing.
        return Ok(Patch::Empty);
    }
    Ok(Patch::Mailbox {
        bytes: translation.apply(&raw),
        commits: request.pending,
        squashed: squash,
    })
}

/// Headers and body of a squashed mailbox message, up to the `---` line.
#[derive(Clone, Debug)]
pub struct SquashHeader<'a> {
    pub ident: String,
    pub anchor: &'a GitOid,
    pub source_rev: &'a GitOid,
    pub commits: usize,
    pub source_path: &'a str,
    pub dest_path: &'a str,
    /// Medium-format log of the squashed commits.
    pub log: String,
}

impl SquashHeader<'_> {
    /// The message subject (without `[PATCH]`).
    #[must_use]
    pub fn subject(&self) -> String {
        format!(
            "Squashed {} commit(s) {}..{} from {} into {}",
            self.commits,
            self.anchor.short(),
            self.source_rev.short(),
            display_path(self.source_path),
            display_path(self.dest_path),
        )
    }

    /// Render everything before the diff.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!(
            "From {} {MBOX_DATE}\nFrom: {}\nSubject: [PATCH] {}\n\n",
            self.source_rev,
            self.ident,
            self.subject()
        );
        let log = self.log.trim_end();
        if !log.is_empty() {
            out.push_str(log);
            out.push('\n');
        }
        out.push_str("---\n");
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

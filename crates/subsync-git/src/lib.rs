//! Git command layer for subsync.
//!
//! This crate defines the [`GitRepo`] trait, the single interface through
//! which subsync talks to git. Nothing else in the workspace spawns `git`
//! directly; callers depend on `subsync-git` and program against the trait.
//!
//! # Crate layout
//!
//! - [`repo`]: the [`GitRepo`] trait definition.
//! - [`types`]: value types used in trait signatures ([`GitOid`],
//!   [`TreeEntry`], [`PatchSpec`], [`ApplyOutcome`], etc.).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.
//!
//! The only implementation, [`CliRepo`], shells out to the `git` binary.
//! `format-patch`, `am` and `ls-remote` have no library equivalent, so the
//! CLI is the backend rather than a fallback.

pub mod error;
pub mod repo;
pub mod types;

// CLI-backed implementation modules
mod apply_impl;
mod cli_repo;
mod history_impl;
mod patch_impl;
mod refs_impl;
mod remote_impl;

pub use cli_repo::CliRepo;

// Re-export the main trait and commonly used types at the crate root for
// ergonomic imports: `use subsync_git::{GitRepo, GitOid, GitError};`
pub use error::GitError;
pub use repo::GitRepo;
pub use types::{
    ApplyOutcome, CommitFilter, GitOid, ObjectKind, OidParseError, PatchSpec, RemoteRef,
    TreeEntry,
};

//! subsync library crate.
//!
//! Keeps directories of this repository in sync with paths in upstream git
//! repositories by carrying their history over as patches. The primary
//! interface is the `subsync` binary; the modules are public so integration
//! tests can drive the workflow and its pieces directly.
//!
//! Pipeline per remote definition:
//!
//! ```text
//! manifest → remote (resolve + fetch) → history (scan both sides)
//!          → matcher (anchor) → patch (mailbox) → workflow (am + merge)
//! ```

pub mod config;
pub mod error;
pub mod history;
pub mod manifest;
pub mod marker;
pub mod matcher;
#[cfg(test)]
#[allow(clippy::all, clippy::pedantic, clippy::nursery, dead_code)]
mod mock_repo;
pub mod patch;
pub mod remote;
pub mod telemetry;
pub mod workflow;
pub mod workflow_state;

pub use error::SyncError;

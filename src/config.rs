//! Repository configuration (`.subsync.toml`).
//!
//! Defines the typed configuration for the optional `.subsync.toml` file at
//! the repository root: branch names used by a run and patch-generation
//! defaults. Command-line flags override anything set here.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// File name looked up at the repository root.
pub const CONFIG_FILE: &str = ".subsync.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level subsync configuration.
///
/// Missing fields use sensible defaults. Missing file → all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubsyncConfig {
    /// Branch names used during a run.
    #[serde(default)]
    pub branches: BranchConfig,

    /// Patch generation and application settings.
    #[serde(default)]
    pub patch: PatchConfig,
}

// ---------------------------------------------------------------------------
// BranchConfig
// ---------------------------------------------------------------------------

/// Names of the integration branches a run creates.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchConfig {
    /// Accumulates one merge per remote definition (default: `subsync/staging`).
    #[serde(default = "default_staging")]
    pub staging: String,

    /// Receives one remote's patch at a time (default: `subsync/topic`).
    #[serde(default = "default_topic")]
    pub topic: String,
}

impl Default for BranchConfig {
    fn default() -> Self {
        Self {
            staging: default_staging(),
            topic: default_topic(),
        }
    }
}

fn default_staging() -> String {
    "subsync/staging".to_owned()
}

fn default_topic() -> String {
    "subsync/topic".to_owned()
}

// ---------------------------------------------------------------------------
// PatchConfig
// ---------------------------------------------------------------------------

/// Patch generation settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchConfig {
    /// When to collapse the pending range into one synthetic commit.
    #[serde(default)]
    pub squashing: Squashing,

    /// How many recent commits to search for a previous sync marker.
    #[serde(default = "default_marker_search_depth")]
    pub marker_search_depth: usize,

    /// Pass `--3way` to `git am`.
    #[serde(default = "default_three_way")]
    pub three_way: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            squashing: Squashing::default(),
            marker_search_depth: default_marker_search_depth(),
            three_way: default_three_way(),
        }
    }
}

const fn default_marker_search_depth() -> usize {
    500
}

const fn default_three_way() -> bool {
    true
}

/// Squashing mode for patch generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Squashing {
    /// Always emit one patch per commit, even across merges.
    Never,
    /// Squash only when the range contains a merge commit.
    #[default]
    Auto,
    /// Always squash the range into one patch.
    Always,
}

impl fmt::Display for Squashing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::Auto => write!(f, "auto"),
            Self::Always => write!(f, "always"),
        }
    }
}

impl FromStr for Squashing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            _ => Err(format!("invalid squashing mode '{s}'. Use: never, auto, or always")),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a subsync configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<std::path::PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl SubsyncConfig {
    /// Load `.subsync.toml` from a repository root.
    ///
    /// # Errors
    /// See [`SubsyncConfig::load`].
    pub fn load_from_root(root: &Path) -> Result<Self, ConfigError> {
        Self::load(&root.join(CONFIG_FILE))
    }

    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

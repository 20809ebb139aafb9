//! Manifest parsing.
//!
//! One definition per line: `remote_name remote_ref local_path [remote_path]`,
//! separated by tabs or spaces. Blank lines and lines starting with `#` are
//! ignored. `remote_path` defaults to `local_path`.

use std::io::Read;
use std::path::PathBuf;

use crate::error::{SyncError, io_err};
use crate::remote::RemoteDefinition;

/// Where a manifest is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManifestSource {
    /// A file on disk.
    File(PathBuf),
    /// Standard input (`-` on the command line).
    Stdin,
}

impl ManifestSource {
    /// Interpret a command-line argument; `-` means stdin.
    #[must_use]
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(arg))
        }
    }

    /// Name used in error messages.
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Stdin => "<stdin>".to_owned(),
        }
    }
}

/// Parse manifest text.
///
/// # Errors
/// [`SyncError::Manifest`] for a line with fewer than 3 or more than 4 columns.
pub fn parse(source_name: &str, text: &str) -> Result<Vec<RemoteDefinition>, SyncError> {
    let mut defs = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = line.split_whitespace().collect();
        let def = match cols.as_slice() {
            [name, rref, local] => RemoteDefinition::new(name, rref, local, local),
            [name, rref, local, remote] => RemoteDefinition::new(name, rref, local, remote),
            _ => {
                return Err(SyncError::Manifest {
                    source_name: source_name.to_owned(),
                    line_number: idx + 1,
                    line: raw.to_owned(),
                });
            }
        };
        defs.push(def);
    }
    Ok(defs)
}

/// Read and concatenate the definitions of every source, in order.
///
/// Stdin is read at most once, however many times `-` is given.
///
/// # Errors
/// I/O failures, parse failures, or [`SyncError::EmptyManifest`] when the
/// sources hold no definitions at all.
pub fn load(sources: &[ManifestSource]) -> Result<Vec<RemoteDefinition>, SyncError> {
    let mut defs = Vec::new();
    let mut stdin_read = false;
    for source in sources {
        let text = match source {
            ManifestSource::File(path) => std::fs::read_to_string(path)
                .map_err(|e| io_err(format!("read manifest {}", path.display()), e))?,
            ManifestSource::Stdin if stdin_read => continue,
            ManifestSource::Stdin => {
                stdin_read = true;
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .map_err(|e| io_err("read manifest from stdin", e))?;
                text
            }
        };
        defs.extend(parse(&source.name(), &text)?);
    }
    if defs.is_empty() {
        return Err(SyncError::EmptyManifest {
            sources: sources
                .iter()
                .map(ManifestSource::name)
                .collect::<Vec<_>>()
                .join(", "),
        });
    }
    Ok(defs)
}

use std::path::PathBuf;

use thiserror::Error;

/// Failure taxonomy for a reconciliation session.
///
/// `StorageCorrupt` and a `Transfer` during listing are fatal for the pass.
/// `Resolution`, `Transfer` during a single download, and `LocalIo` fail
/// only the affected item; the pull driver collects them and keeps going.
#[derive(Debug, Error)]
pub enum TetherError {
    /// The persisted snapshot exists but cannot be parsed. No partial
    /// recovery: the session must not run against a half-read store.
    #[error("snapshot store {path} is corrupt: {reason}")]
    StorageCorrupt { path: PathBuf, reason: String },

    /// A change could not be mapped back to a live remote reference.
    #[error("no live remote reference for {url}")]
    Resolution { url: String },

    /// Network failure while listing the remote tree or fetching content.
    #[error("transfer failed for {what}: {reason}")]
    Transfer { what: String, reason: String },

    /// Disk failure (permissions, disk full) touching a single local path.
    #[error("io error at {path}: {source}")]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unusable configuration; reported before a pass starts.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TetherError {
    pub fn transfer(what: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        TetherError::Transfer {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn local_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TetherError::LocalIo {
            path: path.into(),
            source,
        }
    }
}

//! Error types for the registry core

use std::path::PathBuf;

use qlight_common::QlightError;
use thiserror::Error;

/// Errors raised while persisting or loading the registry snapshot.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Reading, writing or renaming the snapshot file failed
    #[error("snapshot I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The record set could not be serialized
    #[error("snapshot encoding error: {0}")]
    Encode(#[source] serde_json::Error),

    /// The snapshot file is not a valid record array
    #[error("snapshot decode error: {0}")]
    Decode(#[source] serde_json::Error),

    /// The snapshot writer task has stopped
    #[error("snapshot writer is no longer running")]
    WriterClosed,

    /// A flush requested through the writer failed; the cause was logged by the writer
    #[error("snapshot flush failed: {0}")]
    FlushFailed(String),

    /// The blocking write task panicked or was cancelled
    #[error("snapshot task failed: {0}")]
    Task(String),
}

impl RegistryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RegistryError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<RegistryError> for QlightError {
    fn from(err: RegistryError) -> Self {
        QlightError::PersistenceError(err.to_string())
    }
}

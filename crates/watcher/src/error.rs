//! Error types for the polling watcher.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
///
/// Configuration and lifecycle errors are returned directly to the caller.
/// Listing errors and deleted roots are delivered on the error channel while
/// polling continues.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("no such file or directory: {path}")]
    NotFound { path: PathBuf },

    #[error("cannot resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to list {path}: {source}")]
    Listing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("filter hook failed for {path}: {source}")]
    Filter {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("watched file or folder deleted: {path}")]
    WatchedFileDeleted { path: PathBuf },

    #[error("watcher is already running")]
    AlreadyRunning,

    #[error("watcher is closed")]
    Closed,

    #[error("poll interval must be greater than zero")]
    DurationTooShort,
}

impl WatchError {
    /// Map an I/O failure on `path` to a configuration error
    pub(crate) fn resolve(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            WatchError::NotFound { path }
        } else {
            WatchError::Resolve { path, source }
        }
    }

    /// A watched root vanished
    pub fn is_watched_file_deleted(&self) -> bool {
        matches!(self, WatchError::WatchedFileDeleted { .. })
    }

    /// Informational conditions a consumer can keep polling through
    pub fn is_recoverable(&self) -> bool {
        self.is_watched_file_deleted()
    }
}

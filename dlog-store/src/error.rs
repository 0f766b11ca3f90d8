use dlog_types::RecordError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by [`crate::HistoryStore`].
///
/// Every variant is terminal for the operation that raised it; the store
/// never retries on its own.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("history file already exists: {}", path.display())]
    AlreadyExists { path: PathBuf },

    #[error("failed to write history file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read history file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("history file is corrupted {}: {source}", path.display())]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("timed out after {waited:?} waiting for lock {}", path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    #[error("failed to create lock {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to back up history file {}: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid record: {0}")]
    InvalidRecord(#[from] RecordError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

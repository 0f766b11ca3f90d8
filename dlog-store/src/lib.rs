//! Persistent command history store.
//!
//! The store owns a single JSON file holding `{ "history": [...] }` and its
//! sibling artifacts:
//!
//! - `<path>.lock` - present only while a write is in its critical section
//! - `<path>.tmp` - present only while a write is in flight
//! - `<path>.backup.<stamp>` - one per backup, kept until removed by hand
//!
//! Writes are serialized across processes by the lock file and made visible
//! atomically by writing to the temp file and renaming it over the store.
//! Reads take no lock.

mod atomic;
mod error;
mod lock;
mod store;


use std::time::Duration;

pub use crate::error::{StoreError, StoreResult};
pub use crate::store::{HistoryStore, StoreConfig};

/// Default time an append waits for the lock before giving up.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Default delay between two lock attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const LOCK_SUFFIX: &str = ".lock";
pub const TEMP_SUFFIX: &str = ".tmp";
pub const BACKUP_SUFFIX: &str = ".backup.";

//! Advisory lock represented by the existence of a sibling file.
//!
//! This is best-effort mutual exclusion between processes sharing one
//! filesystem. A holder that dies leaves the lock file behind and every later
//! writer times out until an operator removes it.

use crate::error::{StoreError, StoreResult};
use chrono::{SecondsFormat, Utc};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// A held lock. Release it with [`LockFile::release`].
#[derive(Debug)]
#[must_use = "a lock that is never released blocks every other writer"]
pub(crate) struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Poll until the lock file can be created or `timeout` has passed since
    /// the first attempt.
    pub(crate) fn acquire(
        path: &Path,
        timeout: Duration,
        poll_interval: Duration,
    ) -> StoreResult<Self> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    // The token is informational only; existence is the lock.
                    if let Err(err) = file.write_all(lock_token().as_bytes()) {
                        debug!("failed to write lock token to {:?}: {}", path, err);
                    }
                    debug!("acquired lock {:?} after {} attempt(s)", path, attempts);
                    return Ok(LockFile {
                        path: path.to_path_buf(),
                    });
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    let waited = started.elapsed();
                    if waited >= timeout {
                        return Err(StoreError::LockTimeout {
                            path: path.to_path_buf(),
                            waited,
                        });
                    }
                    thread::sleep(poll_interval.min(timeout - waited));
                }
                Err(source) => {
                    return Err(StoreError::Lock {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
    }

    /// Delete the lock file.
    ///
    /// Callers log the error instead of propagating it: by the time a lock is
    /// released the protected write has already succeeded or failed.
    pub(crate) fn release(self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("released lock {:?}", self.path);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

fn lock_token() -> String {
    format!(
        "pid={} acquired={}\n",
        std::process::id(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

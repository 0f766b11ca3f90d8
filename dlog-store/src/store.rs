use crate::atomic;
use crate::error::{StoreError, StoreResult};
use crate::lock::LockFile;
use crate::{BACKUP_SUFFIX, DEFAULT_LOCK_TIMEOUT, DEFAULT_POLL_INTERVAL, LOCK_SUFFIX, TEMP_SUFFIX};
use chrono::{SecondsFormat, Utc};
use dlog_types::{HistoryDocument, Record};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the store lives and how long writers wait for each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub lock_timeout: Duration,
    pub poll_interval: Duration,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            path: path.into(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Append-only history store backed by one JSON file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    config: StoreConfig,
}

impl HistoryStore {
    pub fn new(config: StoreConfig) -> Self {
        HistoryStore { config }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn lock_path(&self) -> PathBuf {
        sibling(&self.config.path, LOCK_SUFFIX)
    }

    pub fn temp_path(&self) -> PathBuf {
        sibling(&self.config.path, TEMP_SUFFIX)
    }

    pub fn exists(&self) -> bool {
        self.config.path.exists()
    }

    /// Create an empty store.
    ///
    /// An existing file is kept and `AlreadyExists` returned, unless `force`
    /// is set, in which case the file is backed up first. Runs under the
    /// write lock so it never shares the temp file with an append.
    pub fn initialize(&self, force: bool) -> StoreResult<()> {
        self.ensure_parent_dir()?;
        self.with_lock(|| {
            let path = self.path();
            if path.exists() {
                if !force {
                    return Err(StoreError::AlreadyExists {
                        path: path.to_path_buf(),
                    });
                }
                self.backup_locked()?;
            }

            atomic::write_json(path, &self.temp_path(), &HistoryDocument::default())?;
            info!("initialized history store at {:?}", path);
            Ok(())
        })
    }

    /// Append one record to the end of the history.
    pub fn append(&self, record: Record) -> StoreResult<()> {
        record.validate()?;
        self.ensure_parent_dir()?;
        self.with_lock(|| self.append_locked(record))
    }

    fn append_locked(&self, record: Record) -> StoreResult<()> {
        let path = self.path();
        let mut document = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice::<HistoryDocument>(&bytes).map_err(|err| {
                StoreError::Read {
                    path: path.to_path_buf(),
                    source: err.into(),
                }
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => HistoryDocument::default(),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        debug!("appending {:?} after {} record(s)", record.command, document.history.len());
        document.history.push(record);
        atomic::write_json(path, &self.temp_path(), &document)
    }

    /// Run `f` while holding the write lock. A failed release is logged, not
    /// returned: the protected operation has already finished by then.
    fn with_lock<T>(&self, f: impl FnOnce() -> StoreResult<T>) -> StoreResult<T> {
        let lock_path = self.lock_path();
        let lock = LockFile::acquire(
            &lock_path,
            self.config.lock_timeout,
            self.config.poll_interval,
        )?;

        let result = f();

        if let Err(err) = lock.release() {
            warn!("failed to release lock {:?}: {}", lock_path, err);
        }
        result
    }

    /// Read the history in append order.
    ///
    /// With `Some(limit)` where `0 < limit < len`, only the most recent
    /// `limit` records are returned. A missing file reads as empty.
    pub fn read(&self, limit: Option<usize>) -> StoreResult<Vec<Record>> {
        let path = self.path();
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let document: HistoryDocument =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupted {
                path: path.to_path_buf(),
                source,
            })?;

        let mut history = document.history;
        if let Some(limit) = limit {
            if limit > 0 && limit < history.len() {
                history.drain(..history.len() - limit);
            }
        }
        Ok(history)
    }

    /// Move the store file aside to `<path>.backup.<stamp>`.
    ///
    /// Returns the backup path, or `None` when there was nothing to back up.
    /// The copy is complete before the original is removed.
    pub fn backup(&self) -> StoreResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }
        self.with_lock(|| self.backup_locked())
    }

    fn backup_locked(&self) -> StoreResult<Option<PathBuf>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }

        let backup_path = self.next_backup_path();
        let backup_err = |source| StoreError::Backup {
            path: path.to_path_buf(),
            source,
        };

        std::fs::copy(path, &backup_path).map_err(backup_err)?;
        std::fs::remove_file(path).map_err(backup_err)?;

        info!("backed up {:?} to {:?}", path, backup_path);
        Ok(Some(backup_path))
    }

    /// List existing backups, oldest first.
    pub fn backups(&self) -> StoreResult<Vec<PathBuf>> {
        let path = self.path();
        let (Some(dir), Some(name)) = (path.parent(), path.file_name()) else {
            return Ok(Vec::new());
        };
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        let mut prefix = name.to_os_string();
        prefix.push(BACKUP_SUFFIX);
        let prefix = prefix.to_string_lossy().into_owned();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };

        let mut backups: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
            .map(|entry| entry.path())
            .collect();
        backups.sort();
        Ok(backups)
    }

    /// Content of the lock file if some writer currently holds it.
    pub fn lock_holder(&self) -> Option<String> {
        std::fs::read_to_string(self.lock_path())
            .ok()
            .map(|token| token.trim().to_string())
    }

    /// Remove a lock file left behind by a dead writer.
    ///
    /// Returns whether a lock file was present. Only an operator should call
    /// this; the store never breaks a lock by itself.
    pub fn force_unlock(&self) -> StoreResult<bool> {
        let lock_path = self.lock_path();
        match std::fs::remove_file(&lock_path) {
            Ok(()) => {
                warn!("removed lock {:?} by request", lock_path);
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Lock {
                path: lock_path,
                source,
            }),
        }
    }

    fn next_backup_path(&self) -> PathBuf {
        let stamp = Utc::now()
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let base = sibling(&self.config.path, &format!("{BACKUP_SUFFIX}{stamp}"));
        let mut candidate = base.clone();
        let mut n = 0;
        while candidate.exists() {
            n += 1;
            candidate = sibling(&base, &format!("-{n}"));
        }
        candidate
    }

    fn ensure_parent_dir(&self) -> StoreResult<()> {
        match self.path().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                    path: self.path().to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

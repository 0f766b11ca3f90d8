//! Subcommand handlers. Each one calls the store and writes its report to `out`.

use crate::query;
use anyhow::{Context as _, Result};
use dlog_store::{HistoryStore, StoreError};
use dlog_types::Record;
use std::io::Write;
use tracing::{debug, info};

/// Create the history file; with `force` the existing one is backed up first.
pub fn init(store: &HistoryStore, force: bool, out: &mut impl Write) -> Result<()> {
    let before = store.backups()?;
    store.initialize(force)?;

    writeln!(out, "Initialized history at {}", store.path().display())?;
    for backup in store.backups()?.into_iter().filter(|b| !before.contains(b)) {
        writeln!(out, "Previous history saved to {}", backup.display())?;
    }
    Ok(())
}

/// Print the history as a table after filtering and limiting.
pub fn show(
    store: &HistoryStore,
    filter: Option<&str>,
    limit: Option<usize>,
    out: &mut impl Write,
) -> Result<()> {
    let records = store.read(None)?;
    debug!("read {} record(s)", records.len());
    let records = query::select(records, filter, limit);
    writeln!(out, "{}", query::format_table(&records))?;
    Ok(())
}

/// Append one captured command.
pub fn log(store: &HistoryStore, record: Record) -> Result<()> {
    store
        .append(record)
        .with_context(|| format!("failed to log command to {}", store.path().display()))
}

/// Explicit recovery: move the current file aside and start a fresh one.
pub fn backup(store: &HistoryStore, out: &mut impl Write) -> Result<()> {
    match store.backup()? {
        Some(path) => writeln!(out, "History saved to {}", path.display())?,
        None => writeln!(out, "No history file at {}", store.path().display())?,
    }
    store.initialize(false)?;
    writeln!(out, "Initialized history at {}", store.path().display())?;
    Ok(())
}

pub fn status(store: &HistoryStore, out: &mut impl Write) -> Result<()> {
    writeln!(out, "History file: {}", store.path().display())?;
    match store.read(None) {
        Ok(_) if !store.exists() => writeln!(out, "Records: none (not initialized)")?,
        Ok(records) => writeln!(out, "Records: {}", records.len())?,
        Err(err @ StoreError::Corrupted { .. }) => {
            writeln!(out, "Records: unreadable ({err})")?;
            writeln!(out, "Run `dlog backup` to move it aside and start over.")?;
        }
        Err(err) => return Err(err.into()),
    }
    match store.lock_holder() {
        Some(holder) => writeln!(out, "Lock: held ({holder})")?,
        None => writeln!(out, "Lock: free")?,
    }
    writeln!(out, "Backups: {}", store.backups()?.len())?;
    Ok(())
}

/// Remove a stale lock file left by a writer that died.
pub fn unlock(store: &HistoryStore, out: &mut impl Write) -> Result<()> {
    let holder = store.lock_holder();
    if store.force_unlock()? {
        info!("removed lock held by {:?}", holder);
        writeln!(
            out,
            "Removed lock {} ({})",
            store.lock_path().display(),
            holder.unwrap_or_default()
        )?;
    } else {
        writeln!(out, "No lock at {}", store.lock_path().display())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlog_store::StoreConfig;
    use std::time::Duration;
    use tempfile::TempDir;

    fn setup() -> (TempDir, HistoryStore) {
        let _ = tracing_subscriber::fmt::try_init();
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("history.json"))
            .with_lock_timeout(Duration::from_millis(200))
            .with_poll_interval(Duration::from_millis(10));
        (dir, HistoryStore::new(config))
    }

    fn record(command: &str) -> Record {
        Record::new("2025-12-25T01:03:14.221Z", "alice", command, 0, "/proj")
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> Result<String> {
        let mut buf = Vec::new();
        f(&mut buf)?;
        Ok(String::from_utf8(buf)?)
    }

    #[test]
    fn test_scenario() -> Result<()> {
        let (_dir, store) = setup();
        output(|out| init(&store, false, out))?;
        for cmd in ["npm install", "git status", "npm run build"] {
            log(&store, record(cmd))?;
        }

        let all = store.read(None)?;
        let found = query::filter(all.clone(), "npm");
        assert_eq!(found, vec![all[0].clone(), all[2].clone()]);

        let text = output(|out| show(&store, Some("npm"), None, out))?;
        assert!(text.contains("npm install"));
        assert!(text.contains("npm run build"));
        assert!(!text.contains("git status"));

        let text = output(|out| show(&store, Some("npm"), Some(1), out))?;
        assert!(!text.contains("npm install"));
        assert!(text.contains("npm run build"));
        Ok(())
    }

    #[test]
    fn test_show_empty() -> Result<()> {
        let (_dir, store) = setup();
        let text = output(|out| show(&store, None, None, out))?;
        assert_eq!(text.trim_end(), query::NO_HISTORY_MESSAGE);
        Ok(())
    }

    #[test]
    fn test_init_force_reports_backup() -> Result<()> {
        let (_dir, store) = setup();
        output(|out| init(&store, false, out))?;
        log(&store, record("ls"))?;

        assert!(output(|out| init(&store, false, out)).is_err());
        let text = output(|out| init(&store, true, out))?;
        assert!(text.contains("Previous history saved to"));
        assert_eq!(store.backups()?.len(), 1);
        assert!(store.read(None)?.is_empty());
        Ok(())
    }

    #[test]
    fn test_backup_recovers_corrupted_store() -> Result<()> {
        let (_dir, store) = setup();
        std::fs::write(store.path(), "{oops")?;
        assert!(output(|out| show(&store, None, None, out)).is_err());

        let text = output(|out| status(&store, out))?;
        assert!(text.contains("unreadable"));

        let text = output(|out| backup(&store, out))?;
        assert!(text.contains("History saved to"));
        assert!(store.read(None)?.is_empty());
        let backups = store.backups()?;
        assert_eq!(std::fs::read_to_string(&backups[0])?, "{oops");
        Ok(())
    }

    #[test]
    fn test_status_reports_binary_garbage_as_unreadable() -> Result<()> {
        let (_dir, store) = setup();
        std::fs::write(store.path(), [0xff, 0xfe, 0x00, 0x80])?;

        let text = output(|out| status(&store, out))?;
        assert!(text.contains("Records: unreadable"));
        assert!(text.contains("dlog backup"));
        Ok(())
    }

    #[test]
    fn test_status_and_unlock() -> Result<()> {
        let (_dir, store) = setup();
        let text = output(|out| status(&store, out))?;
        assert!(text.contains("not initialized"));
        assert!(text.contains("Lock: free"));

        log(&store, record("ls"))?;
        std::fs::write(store.lock_path(), "pid=42")?;
        let text = output(|out| status(&store, out))?;
        assert!(text.contains("Records: 1"));
        assert!(text.contains("Lock: held (pid=42)"));

        assert!(log(&store, record("pwd")).is_err());

        let text = output(|out| unlock(&store, out))?;
        assert!(text.contains("Removed lock"));
        log(&store, record("pwd"))?;
        assert_eq!(store.read(None)?.len(), 2);

        let text = output(|out| unlock(&store, out))?;
        assert!(text.contains("No lock"));
        Ok(())
    }
}

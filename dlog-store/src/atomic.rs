//! Write-to-temp-then-rename.

use crate::error::{StoreError, StoreResult};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Serialize `value` as pretty JSON and move it onto `path` in one rename.
///
/// Readers see either the previous file or the new one, never a partial
/// write. On failure `temp_path` is removed best-effort and the original
/// error is returned.
pub(crate) fn write_json<T: Serialize>(
    path: &Path,
    temp_path: &Path,
    value: &T,
) -> StoreResult<()> {
    let result = write_and_rename(path, temp_path, value);
    if result.is_err() {
        discard_temp(temp_path);
    }
    result.map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_and_rename<T: Serialize>(
    path: &Path,
    temp_path: &Path,
    value: &T,
) -> std::io::Result<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');

    let mut file = File::create(temp_path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    drop(file);

    std::fs::rename(temp_path, path)?;
    debug!("wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

fn discard_temp(temp_path: &Path) {
    if let Err(err) = std::fs::remove_file(temp_path) {
        debug!("ignoring temp cleanup failure for {:?}: {}", temp_path, err);
    }
}

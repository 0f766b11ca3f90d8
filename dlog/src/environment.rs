//! XDG locations and environment variables.

use anyhow::Context as _;
use anyhow::Result;
use std::path::PathBuf;

pub const APP_NAME: &str = "dlog";

pub const HISTORY_FILE_NAME: &str = "history.json";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOG_FILE_NAME: &str = "dlog.log";

pub const ENV_HISTORY_FILE: &str = "DLOG_HISTORY_FILE";
pub const ENV_LOCK_TIMEOUT_MS: &str = "DLOG_LOCK_TIMEOUT_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "DLOG_POLL_INTERVAL_MS";
pub const ENV_SESSION: &str = "DLOG_SESSION";
pub const ENV_LOG: &str = "DLOG_LOG";

/// Find an existing configuration file. Does not create directories.
pub fn find_config_file(name: &str) -> Result<Option<PathBuf>> {
    let xdg_dir =
        xdg::BaseDirectories::with_prefix(APP_NAME).context("failed get xdg directory")?;
    Ok(xdg_dir.find_config_file(name))
}

/// Get the path to a data file.
pub fn get_data_file(name: &str) -> Result<PathBuf> {
    let xdg_dir =
        xdg::BaseDirectories::with_prefix(APP_NAME).context("failed get xdg directory")?;
    xdg_dir.place_data_file(name).context("failed get path")
}

/// Get the path to a state file (e.g. logs).
pub fn get_state_file(name: &str) -> Result<PathBuf> {
    let xdg_dir =
        xdg::BaseDirectories::with_prefix(APP_NAME).context("failed get xdg directory")?;
    xdg_dir.place_state_file(name).context("failed get path")
}

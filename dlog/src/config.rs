//! Layered configuration.
//!
//! Precedence, highest first: command line, environment, `config.toml`,
//! built-in defaults.

use crate::environment::{
    self, CONFIG_FILE_NAME, ENV_HISTORY_FILE, ENV_LOCK_TIMEOUT_MS, ENV_POLL_INTERVAL_MS,
    HISTORY_FILE_NAME,
};
use anyhow::{Context as _, Result};
use dlog_store::{DEFAULT_LOCK_TIMEOUT, DEFAULT_POLL_INTERVAL, StoreConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub history_file: Option<String>,
    pub lock_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub shell: Option<String>,
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid config.toml")
    }

    fn load() -> Result<Self> {
        let Some(path) = environment::find_config_file(CONFIG_FILE_NAME)? else {
            return Ok(FileConfig::default());
        };
        debug!("loading config {:?}", path);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        FileConfig::parse(&content).with_context(|| format!("in {}", path.display()))
    }
}

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub history_file: PathBuf,
    pub lock_timeout: Duration,
    pub poll_interval: Duration,
    pub shell: Option<String>,
}

impl Config {
    /// Resolve from the process environment and the XDG config file.
    pub fn load(cli_file: Option<&Path>) -> Result<Self> {
        let file = FileConfig::load()?;
        Config::resolve(
            cli_file,
            |key| std::env::var(key).ok(),
            file,
            || environment::get_data_file(HISTORY_FILE_NAME),
        )
    }

    pub fn resolve(
        cli_file: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
        file: FileConfig,
        default_history_file: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<Self> {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let history_file = match (cli_file, non_empty(ENV_HISTORY_FILE), file.history_file) {
            (Some(path), _, _) => path.to_path_buf(),
            (None, Some(path), _) => expand(&path),
            (None, None, Some(path)) => expand(&path),
            (None, None, None) => default_history_file()?,
        };

        let lock_timeout = match non_empty(ENV_LOCK_TIMEOUT_MS) {
            Some(raw) => parse_millis(ENV_LOCK_TIMEOUT_MS, &raw)?,
            None => file
                .lock_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_LOCK_TIMEOUT),
        };

        let poll_interval = match non_empty(ENV_POLL_INTERVAL_MS) {
            Some(raw) => parse_millis(ENV_POLL_INTERVAL_MS, &raw)?,
            None => file
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLL_INTERVAL),
        };

        Ok(Config {
            history_file,
            lock_timeout,
            poll_interval,
            shell: file.shell,
        })
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(&self.history_file)
            .with_lock_timeout(self.lock_timeout)
            .with_poll_interval(self.poll_interval)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration> {
    let millis: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a number of milliseconds, got {raw:?}"))?;
    Ok(Duration::from_millis(millis))
}

use crate::cli::{Cli, SubCommand};
use crate::config::Config;
use anyhow::{Context as _, Result};
use dlog_store::HistoryStore;
use dlog_types::Record;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::debug;

pub mod cli;
pub mod commands;
pub mod config;
pub mod environment;
pub mod errors;
pub mod query;
pub mod session;

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.file.as_deref())?;
    debug!("config {:?}", config);
    let store = HistoryStore::new(config.store_config());

    let subcommand = cli
        .subcommand
        .unwrap_or(SubCommand::Start { shell: None });

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match subcommand {
        SubCommand::Start { shell } => return session::start(&config, shell.as_deref()),
        SubCommand::Init { force } => commands::init(&store, force, &mut out)?,
        SubCommand::Show { filter, limit } => {
            commands::show(&store, filter.as_deref(), limit, &mut out)?
        }
        SubCommand::Log {
            exit_code,
            cwd,
            note,
            command,
        } => {
            let cwd = match cwd {
                Some(cwd) => cwd,
                None => std::env::current_dir()
                    .context("failed to get current directory")?
                    .to_string_lossy()
                    .into_owned(),
            };
            let mut record = Record::capture(command.join(" "), exit_code, cwd);
            record.note = note;
            commands::log(&store, record)?
        }
        SubCommand::Backup => commands::backup(&store, &mut out)?,
        SubCommand::Status => commands::status(&store, &mut out)?,
        SubCommand::Unlock => commands::unlock(&store, &mut out)?,
    }

    out.flush()?;
    Ok(ExitCode::SUCCESS)
}

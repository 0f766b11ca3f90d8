use anyhow::Result;
use clap::Parser;
use dlog::cli::Cli;
use dlog::environment::{self, ENV_LOG, LOG_FILE_NAME};
use dlog::errors::display_user_error;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_tracing() {
        eprintln!("dlog: logging disabled: {err:#}");
    }

    match dlog::run(cli) {
        Ok(code) => code,
        Err(err) => {
            display_user_error(&err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() -> Result<()> {
    let path = environment::get_state_file(LOG_FILE_NAME)?;
    let log_file = std::sync::Arc::new(
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?,
    );
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))?;
    Ok(())
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// History file to use instead of the configured one
    #[arg(long, global = true, value_name = "PATH")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub subcommand: Option<SubCommand>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SubCommand {
    /// Start a shell whose commands are logged (default)
    Start {
        /// Shell to run instead of $SHELL
        #[arg(long)]
        shell: Option<String>,
    },

    /// Create an empty history file
    Init {
        /// Back up and replace an existing history file
        #[arg(short, long)]
        force: bool,
    },

    /// Show logged commands
    Show {
        /// Only commands containing this text (case-insensitive)
        #[arg(short = 'F', long)]
        filter: Option<String>,

        /// Only the most recent N commands
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Append one command to the history (used by the session hook)
    Log {
        #[arg(long, allow_negative_numbers = true)]
        exit_code: i32,

        /// Working directory, defaults to the current one
        #[arg(long)]
        cwd: Option<String>,

        #[arg(long)]
        note: Option<String>,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Move the history file aside and start a fresh one
    Backup,

    /// Show the state of the history file and its lock
    Status,

    /// Remove a stale lock left by a crashed writer
    Unlock,
}

//! Monitored subshell.
//!
//! `dlog start` runs the user's shell with an rc script that calls
//! `dlog log` after every command. The rc script lives in a temporary
//! directory that is removed when the session ends.

use crate::config::Config;
use crate::environment::{ENV_HISTORY_FILE, ENV_SESSION};
use anyhow::{Context as _, Result, bail};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use tracing::{debug, info, warn};

const EXE_PLACEHOLDER: &str = "@DLOG_EXE@";

const BASH_HOOK: &str = r#"# doge-log session hook
if [ -f "$HOME/.bashrc" ]; then
  . "$HOME/.bashrc"
fi
set -o history

__dlog_ready=""
__dlog_last_histno=""
__dlog_precmd() {
  local __dlog_status=$?
  local __dlog_entry __dlog_histno __dlog_cmd
  __dlog_entry=$(HISTTIMEFORMAT= builtin history 1)
  __dlog_histno=$(printf '%s' "$__dlog_entry" | sed -n -e 's/^ *\([0-9][0-9]*\).*/\1/p')
  __dlog_cmd=$(printf '%s' "$__dlog_entry" | sed -e '1s/^ *[0-9][0-9]*[* ] *//')
  if [ -n "$__dlog_ready" ] && [ -n "$__dlog_cmd" ] && [ "$__dlog_histno" != "$__dlog_last_histno" ]; then
    @DLOG_EXE@ log --exit-code "$__dlog_status" --cwd "$PWD" -- "$__dlog_cmd" >/dev/null
  fi
  __dlog_ready=1
  __dlog_last_histno=$__dlog_histno
  return $__dlog_status
}
PROMPT_COMMAND="__dlog_precmd${PROMPT_COMMAND:+;$PROMPT_COMMAND}"
"#;

const ZSH_HOOK: &str = r#"# doge-log session hook
unset ZDOTDIR
if [[ -f "$HOME/.zshrc" ]]; then
  source "$HOME/.zshrc"
fi

__dlog_cmd=""
__dlog_pending=0
__dlog_preexec() {
  __dlog_cmd="$1"
  __dlog_pending=1
}
__dlog_precmd() {
  local __dlog_status=$?
  if (( __dlog_pending )) && [[ -n "$__dlog_cmd" ]]; then
    @DLOG_EXE@ log --exit-code "$__dlog_status" --cwd "$PWD" -- "$__dlog_cmd" >/dev/null
  fi
  __dlog_pending=0
}
autoload -Uz add-zsh-hook
add-zsh-hook preexec __dlog_preexec
add-zsh-hook precmd __dlog_precmd
"#;

/// Shells the capture hook knows how to install into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    Bash,
    Zsh,
    Other,
}

impl ShellKind {
    pub fn detect(shell: &Path) -> Self {
        let name = shell
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match name.as_str() {
            "bash" => ShellKind::Bash,
            "zsh" => ShellKind::Zsh,
            _ => ShellKind::Other,
        }
    }
}

/// Pick the shell to run: `--shell`, then config, then `$SHELL`, then `bash`.
pub fn resolve_shell(explicit: Option<&str>, configured: Option<&str>) -> Result<PathBuf> {
    let env_shell = std::env::var("SHELL").ok();
    let candidate = explicit
        .or(configured)
        .or(env_shell.as_deref())
        .filter(|s| !s.trim().is_empty());

    match candidate {
        Some(shell) => which::which(shell).with_context(|| format!("shell not found: {shell}")),
        None => which::which("bash").context("no shell configured and bash not found in PATH"),
    }
}

/// The rc script for `kind`, calling `exe` to log commands.
pub fn hook_script(kind: ShellKind, exe: &Path) -> Option<String> {
    let template = match kind {
        ShellKind::Bash => BASH_HOOK,
        ShellKind::Zsh => ZSH_HOOK,
        ShellKind::Other => return None,
    };
    let exe = exe.to_string_lossy();
    Some(template.replace(EXE_PLACEHOLDER, &shell_words::quote(&exe)))
}

/// Run the monitored subshell until it exits.
pub fn start(config: &Config, shell: Option<&str>) -> Result<ExitCode> {
    if std::env::var_os(ENV_SESSION).is_some() {
        bail!("already inside a dlog session");
    }

    let shell = resolve_shell(shell, config.shell.as_deref())?;
    let kind = ShellKind::detect(&shell);
    let exe = std::env::current_exe().context("failed to locate the dlog executable")?;
    let rc_dir = tempfile::Builder::new()
        .prefix("dlog-session-")
        .tempdir()
        .context("failed to create session directory")?;

    let mut command = Command::new(&shell);
    command
        .env(ENV_HISTORY_FILE, &config.history_file)
        .env(ENV_SESSION, "1");

    match (kind, hook_script(kind, &exe)) {
        (ShellKind::Bash, Some(script)) => {
            let rc = rc_dir.path().join("bashrc");
            std::fs::write(&rc, script).context("failed to write session rc")?;
            command.arg("--rcfile").arg(&rc).arg("-i");
        }
        (ShellKind::Zsh, Some(script)) => {
            let rc = rc_dir.path().join(".zshrc");
            std::fs::write(&rc, script).context("failed to write session rc")?;
            command.env("ZDOTDIR", rc_dir.path()).arg("-i");
        }
        _ => {
            warn!("no capture hook for {:?}; commands will not be logged", shell);
            eprintln!(
                "dlog: {} is not supported, commands will not be logged",
                shell.display()
            );
        }
    }

    info!("starting session with {:?}, history {:?}", shell, config.history_file);
    eprintln!(
        "dlog: logging to {} (exit the shell to stop)",
        config.history_file.display()
    );

    let status = command
        .status()
        .with_context(|| format!("failed to start {}", shell.display()))?;
    debug!("session ended: {:?}", status);

    let code = status.code().unwrap_or(1);
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

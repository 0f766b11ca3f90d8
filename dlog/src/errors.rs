use tracing::error;

/// Display error in a user-friendly format without stack traces.
///
/// The full chain goes on one line, e.g. `dlog: failed to log command to ...: timed out ...`.
pub fn display_user_error(err: &anyhow::Error) {
    error!("{:?}", err);
    eprintln!("dlog: {:#}", err);
}

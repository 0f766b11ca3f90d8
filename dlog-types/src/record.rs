//! Record structure for command history.
//!
//! A record is one executed command with when, who, where and how it exited.

use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

static TIMESTAMP_REGEX: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?Z?$").unwrap()
});

/// Validation failures for a [`Record`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("invalid timestamp: {0:?}")]
    Timestamp(String),

    #[error("user must not be empty")]
    EmptyUser,
}

/// A single logged command execution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// ISO-8601 time the command finished, e.g. `2025-12-25T01:03:14.221Z`.
    pub timestamp: String,
    /// User that ran the command.
    pub user: String,
    /// The command text. May be empty.
    pub command: String,
    /// Exit status of the command.
    pub exit_code: i32,
    /// Working directory the command ran in.
    pub cwd: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Record {
    pub fn new(
        timestamp: impl Into<String>,
        user: impl Into<String>,
        command: impl Into<String>,
        exit_code: i32,
        cwd: impl Into<String>,
    ) -> Self {
        Record {
            timestamp: timestamp.into(),
            user: user.into(),
            command: command.into(),
            exit_code,
            cwd: cwd.into(),
            note: None,
        }
    }

    /// Create a record stamped with the current UTC time and the current user.
    pub fn capture(command: impl Into<String>, exit_code: i32, cwd: impl Into<String>) -> Self {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Record::new(timestamp, current_user(), command, exit_code, cwd)
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Check the invariants every persisted record must hold.
    pub fn validate(&self) -> Result<(), RecordError> {
        if !TIMESTAMP_REGEX.is_match(&self.timestamp) {
            return Err(RecordError::Timestamp(self.timestamp.clone()));
        }
        if self.user.trim().is_empty() {
            return Err(RecordError::EmptyUser);
        }
        Ok(())
    }
}

/// The whole store file.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryDocument {
    pub history: Vec<Record>,
}

/// Get the name of the user running this process.
///
/// Looks at `$USER` and `$USERNAME` first, then the passwd entry of the real uid.
pub fn current_user() -> String {
    for key in ["USER", "USERNAME"] {
        if let Ok(name) = std::env::var(key) {
            if !name.trim().is_empty() {
                return name;
            }
        }
    }

    match nix::unistd::User::from_uid(nix::unistd::getuid()) {
        Ok(Some(user)) => user.name,
        Ok(None) => "unknown".to_string(),
        Err(err) => {
            debug!("failed to look up passwd entry: {}", err);
            "unknown".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Record {
        Record::new("2025-12-25T01:03:14.221Z", "alice", "npm install", 0, "/proj")
    }

    #[test]
    fn test_validate_accepts_timestamp_variants() {
        for ts in [
            "2025-12-25T01:03:14.221Z",
            "2025-12-25T01:03:14Z",
            "2025-12-25T01:03:14",
            "2025-12-25T01:03:14.221",
        ] {
            let mut record = sample();
            record.timestamp = ts.to_string();
            assert_eq!(record.validate(), Ok(()), "{ts}");
        }
    }

    #[test]
    fn test_validate_rejects_bad_timestamp() {
        for ts in ["", "yesterday", "2025-12-25 01:03:14", "2025-12-25T01:03Z"] {
            let mut record = sample();
            record.timestamp = ts.to_string();
            assert_eq!(
                record.validate(),
                Err(RecordError::Timestamp(ts.to_string()))
            );
        }
    }

    #[test]
    fn test_validate_rejects_empty_user() {
        let mut record = sample();
        record.user = "  ".to_string();
        assert_eq!(record.validate(), Err(RecordError::EmptyUser));
    }

    #[test]
    fn test_capture_is_valid() {
        let record = Record::capture("", 127, "/tmp");
        assert_eq!(record.validate(), Ok(()));
        assert!(record.timestamp.ends_with('Z'));
        assert_eq!(record.command, "");
        assert_eq!(record.exit_code, 127);
    }

    #[test]
    fn test_note_is_optional_on_the_wire() {
        let json = serde_json::to_string(&sample()).unwrap();
        assert!(!json.contains("note"));

        let noted = sample().with_note("deploy");
        let json = serde_json::to_string(&noted).unwrap();
        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back.note.as_deref(), Some("deploy"));
    }

    #[test]
    fn test_missing_required_field_fails_to_decode() {
        let json = r#"{"timestamp":"2025-12-25T01:03:14Z","user":"alice","exit_code":0,"cwd":"/"}"#;
        assert!(serde_json::from_str::<Record>(json).is_err());

        let json = r#"{"timestamp":"2025-12-25T01:03:14Z","user":"alice","command":null,"exit_code":0,"cwd":"/"}"#;
        assert!(serde_json::from_str::<Record>(json).is_err());
    }
}

//! Shared types for doge-log.
//!
//! - [`Record`] - a single logged command execution
//! - [`HistoryDocument`] - the on-disk `{ "history": [...] }` document
//! - [`RecordError`] - validation failures for records

pub mod record;

pub use record::{HistoryDocument, Record, RecordError, current_user};

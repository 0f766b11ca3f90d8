//! Filtering, limiting and formatting of records already read from the store.
//!
//! Everything here is pure; no I/O.

use dlog_types::Record;
use unicode_width::UnicodeWidthStr;

pub const NO_HISTORY_MESSAGE: &str = "No command history found.";

const HEADERS: [&str; 5] = ["Timestamp", "Command", "Exit Code", "Directory", "User"];
const COLUMN_SEPARATOR: &str = " | ";
const RULE_SEPARATOR: &str = "-+-";

/// Keep records whose command contains `needle`, ignoring case.
///
/// A blank needle returns the input as is.
pub fn filter(records: Vec<Record>, needle: &str) -> Vec<Record> {
    if needle.trim().is_empty() {
        return records;
    }
    let needle = needle.to_lowercase();
    records
        .into_iter()
        .filter(|r| r.command.to_lowercase().contains(&needle))
        .collect()
}

/// Keep only the trailing `limit` records when `0 < limit < len`.
pub fn tail(mut records: Vec<Record>, limit: usize) -> Vec<Record> {
    if limit > 0 && limit < records.len() {
        records.drain(..records.len() - limit);
    }
    records
}

/// Display policy: filter first, then keep the most recent `limit`.
pub fn select(records: Vec<Record>, needle: Option<&str>, limit: Option<usize>) -> Vec<Record> {
    let records = match needle {
        Some(needle) => filter(records, needle),
        None => records,
    };
    match limit {
        Some(limit) => tail(records, limit),
        None => records,
    }
}

/// Render records as an aligned text table.
pub fn format_table(records: &[Record]) -> String {
    if records.is_empty() {
        return NO_HISTORY_MESSAGE.to_string();
    }

    let rows: Vec<[String; 5]> = records
        .iter()
        .map(|r| {
            [
                r.timestamp.clone(),
                r.command.clone(),
                r.exit_code.to_string(),
                r.cwd.clone(),
                r.user.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(UnicodeWidthStr::width);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(join_padded(HEADERS.iter().copied(), &widths));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join(RULE_SEPARATOR),
    );
    for row in &rows {
        lines.push(join_padded(row.iter().map(String::as_str), &widths));
    }
    lines.join("\n")
}

fn join_padded<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, width)| pad(cell, *width))
        .collect::<Vec<_>>()
        .join(COLUMN_SEPARATOR)
}

// `format!("{:<w$}")` counts chars, not terminal columns.
fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(cell.width());
    format!("{cell}{}", " ".repeat(fill))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(command: &str) -> Record {
        Record::new("2025-12-25T01:03:14.221Z", "alice", command, 0, "/proj")
    }

    fn commands(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.command.as_str()).collect()
    }

    fn sample() -> Vec<Record> {
        vec![
            record("npm install"),
            record("git status"),
            record("npm run build"),
            record("NPM ci"),
            record("echo Npm"),
        ]
    }

    #[test]
    fn test_filter_scenario() {
        let records = vec![record("npm install"), record("git status"), record("npm run build")];
        let found = filter(records.clone(), "npm");
        assert_eq!(found, vec![records[0].clone(), records[2].clone()]);
    }

    #[test]
    fn test_filter_ignores_case() {
        for needle in ["npm", "NPM", "nPm"] {
            assert_eq!(
                commands(&filter(sample(), needle)),
                vec!["npm install", "npm run build", "NPM ci", "echo Npm"]
            );
        }
        let found = filter(sample(), "Npm");
        for r in sample() {
            let contains = r.command.to_lowercase().contains("npm");
            assert_eq!(found.contains(&r), contains, "{}", r.command);
        }
    }

    #[test]
    fn test_filter_blank_needle_is_identity() {
        assert_eq!(filter(sample(), ""), sample());
        assert_eq!(filter(sample(), "   "), sample());
    }

    #[test]
    fn test_filter_only_matches_command() {
        let mut r = record("ls");
        r.cwd = "/npm".to_string();
        r.user = "npm".to_string();
        r.note = Some("npm".to_string());
        assert!(filter(vec![r], "npm").is_empty());
    }

    #[test]
    fn test_tail() {
        assert_eq!(commands(&tail(sample(), 2)), vec!["NPM ci", "echo Npm"]);
        assert_eq!(tail(sample(), 0), sample());
        assert_eq!(tail(sample(), 5), sample());
        assert_eq!(tail(sample(), 9), sample());
    }

    #[test]
    fn test_select_filters_before_limiting() {
        let selected = select(sample(), Some("npm"), Some(2));
        assert_eq!(commands(&selected), vec!["NPM ci", "echo Npm"]);

        let selected = select(sample(), Some("git"), Some(3));
        assert_eq!(commands(&selected), vec!["git status"]);

        assert_eq!(select(sample(), None, None), sample());
    }

    #[test]
    fn test_format_table_empty() {
        assert_eq!(format_table(&[]), NO_HISTORY_MESSAGE);
    }

    #[test]
    fn test_format_table_single_record() {
        let table = format_table(&[record("npm install")]);
        for token in [
            "Timestamp",
            "Command",
            "Exit Code",
            "Directory",
            "User",
            "2025-12-25T01:03:14.221Z",
            "npm install",
            "alice",
            "/proj",
        ] {
            assert!(table.contains(token), "missing {token}");
        }
    }

    #[test]
    fn test_format_table_layout() {
        let mut second = record("git status --short");
        second.exit_code = 128;
        second.cwd = "/".to_string();
        let table = format_table(&[record("ls"), second]);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "Timestamp                | Command            | Exit Code | Directory | User "
        );
        assert_eq!(
            lines[1],
            "-------------------------+--------------------+-----------+-----------+------"
        );
        assert_eq!(
            lines[2],
            "2025-12-25T01:03:14.221Z | ls                 | 0         | /proj     | alice"
        );
        assert_eq!(
            lines[3],
            "2025-12-25T01:03:14.221Z | git status --short | 128       | /         | alice"
        );
    }

    #[test]
    fn test_format_table_wide_chars() {
        let table = format_table(&[record("echo 日本語")]);
        let lines: Vec<&str> = table.lines().collect();
        let header_sep = lines[0].find(" | Exit Code").unwrap();
        let row_cell_end = lines[2].find(" | 0").unwrap();
        // Same display column, different byte offsets.
        assert_eq!(
            lines[0][..header_sep].width(),
            lines[2][..row_cell_end].width()
        );
    }
}

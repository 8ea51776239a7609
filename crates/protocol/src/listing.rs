//! Listing formatter for `hdfs dfs -ls` output.
//!
//! The listing command prints a summary line (`Found N items`) followed by one
//! line per child:
//!
//! ```text
//! drwxr-xr-x   - hdfs supergroup          0 2024-01-01 10:00 /base/dir1
//! -rw-r--r--   3 hdfs supergroup       1024 2024-01-01 10:05 /base/file.txt
//! ```
//!
//! Parsing is lenient: a line with fewer than eight fields is dropped and the
//! rest of the listing is still returned. Callers get a best-effort result and
//! never an error.

use serde::{Deserialize, Serialize};

/// Number of whitespace-delimited fields in a listing line. The last field
/// (the path) keeps any internal whitespace.
pub const LISTING_FIELDS: usize = 8;

/// First character of a permission string that marks a directory.
pub const DIRECTORY_MARKER: char = 'd';

/// Placeholder for columns the listing does not provide.
pub const UNKNOWN_COLUMN: &str = "-";

/// Placeholder description for every entry.
pub const NO_DESCRIPTION: &str = "N/A";

/// Type of a listed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl EntryType {
    /// Derive the entry type from a raw permission string.
    pub fn from_permission(permission: &str) -> Self {
        if permission.starts_with(DIRECTORY_MARKER) {
            EntryType::Directory
        } else {
            EntryType::File
        }
    }
}

/// One parsed line of listing output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    /// Final path segment.
    pub name: String,
    /// Full absolute path in the remote filesystem.
    pub path: String,
    /// File or directory.
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    /// Raw permission string, e.g. `drwxr-xr-x`.
    pub permission: String,
    pub owner: String,
    pub group: String,
    /// Size as reported; not parsed.
    pub size: String,
    /// `"<date> <time>"` as reported.
    pub last_modified: String,
    pub replication: String,
    pub block_size: String,
    pub file_description: String,
}

impl DirectoryEntry {
    /// Build an entry from the eight listing fields.
    ///
    /// The replication column is ignored; `replication`, `block_size` and
    /// `file_description` are placeholders.
    fn from_fields(fields: &[&str]) -> Self {
        let permission = fields[0];
        let path = fields[7];

        Self {
            name: entry_name(path).to_string(),
            path: path.to_string(),
            entry_type: EntryType::from_permission(permission),
            permission: permission.to_string(),
            owner: fields[2].to_string(),
            group: fields[3].to_string(),
            size: fields[4].to_string(),
            last_modified: format!("{} {}", fields[5], fields[6]),
            replication: UNKNOWN_COLUMN.to_string(),
            block_size: UNKNOWN_COLUMN.to_string(),
            file_description: NO_DESCRIPTION.to_string(),
        }
    }

    /// Whether this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.entry_type == EntryType::Directory
    }
}

/// Returns the substring of `path` after its last `/`.
///
/// A path without a separator is returned unchanged.
pub fn entry_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Split `line` on runs of whitespace into at most `max` fields.
///
/// The final field is the unsplit remainder of the line with its leading
/// whitespace removed.
fn split_fields(line: &str, max: usize) -> Vec<&str> {
    let mut fields = Vec::with_capacity(max);
    let mut rest = line.trim_start();

    while !rest.is_empty() {
        if fields.len() + 1 == max {
            fields.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                fields.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                fields.push(rest);
                break;
            }
        }
    }

    fields
}

/// Parse a single child line. Returns `None` for malformed lines.
pub fn parse_line(line: &str) -> Option<DirectoryEntry> {
    let fields = split_fields(line, LISTING_FIELDS);
    if fields.len() < LISTING_FIELDS {
        return None;
    }
    Some(DirectoryEntry::from_fields(&fields))
}

/// Parse the full output of a listing command.
///
/// The first line is the summary and is skipped. Entries keep the order of
/// the input lines.
pub fn parse_listing(output: &str) -> Vec<DirectoryEntry> {
    output
        .trim()
        .lines()
        .skip(1)
        .filter_map(parse_line)
        .collect()
}

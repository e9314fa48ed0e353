//! Shard file naming conventions.
//!
//! One shard holds one session's entries for one calendar day:
//! `<session_id>-<YYYY-MM-DD>.jsonl`.  The date lives in the filename so
//! retention decisions survive file copies (mtime does not).
//!
//! Session ids may themselves contain hyphens, so `parse_shard_name` peels
//! the date off the right-hand end rather than splitting on `-`.

use std::path::PathBuf;
use std::time::SystemTime;

use chrono::NaiveDate;

/// File extension for shard files, without the leading dot.
pub const SHARD_EXT: &str = "jsonl";

/// Length of the `YYYY-MM-DD` date component in a shard filename.
const DATE_LEN: usize = 10;

/// Build the shard filename for a session and calendar date.
pub fn shard_file_name(session_id: &str, date: NaiveDate) -> String {
    format!("{}-{}.{}", session_id, date.format("%Y-%m-%d"), SHARD_EXT)
}

/// Parse `<session_id>-<YYYY-MM-DD>.jsonl` back into its components.
///
/// Returns `None` for filenames that do not follow the shard convention —
/// foreign files in the audit directory are ignored, not errors.
pub fn parse_shard_name(file_name: &str) -> Option<(String, NaiveDate)> {
    let stem = file_name.strip_suffix(&format!(".{}", SHARD_EXT))?;
    if stem.len() < DATE_LEN + 2 || !stem.is_char_boundary(stem.len() - DATE_LEN) {
        return None;
    }
    let (session_part, date_part) = stem.split_at(stem.len() - DATE_LEN);
    let session_id = session_part.strip_suffix('-')?;
    if session_id.is_empty() {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    Some((session_id.to_string(), date))
}

/// One discovered shard file, with the metadata operators see in listings.
#[derive(Debug, Clone)]
pub struct ShardInfo {
    /// Full path to the shard file.
    pub path: PathBuf,
    /// Session the shard belongs to, parsed from the filename.
    pub session_id: String,
    /// Calendar day the shard covers, parsed from the filename.
    pub date: NaiveDate,
    /// File size in bytes at discovery time.
    pub size_bytes: u64,
    /// Filesystem modification time at discovery time.
    pub modified: Option<SystemTime>,
}

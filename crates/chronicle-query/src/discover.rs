//! Shard discovery and directory listing.
//!
//! Shards are found by filename convention alone (`parse_shard_name`);
//! anything else in the audit directory is ignored.  Discovery sorts by
//! `(date, session_id)`, so scanning discovered shards in order yields each
//! session's entries chronologically even when the chain spans many days.

use std::fs;
use std::path::Path;

use tracing::debug;

use chronicle_contracts::{parse_shard_name, ChronicleError, ChronicleResult, ShardInfo};

/// Enumerate shard files under `audit_dir`, optionally restricted to a set
/// of session ids.  An empty `sessions` slice means "all sessions".
///
/// Results are sorted by `(date, session_id)`.  A missing audit directory
/// is treated as "no shards", not an error — a fresh installation has no
/// history yet.
pub fn discover_shards(
    audit_dir: &Path,
    sessions: &[String],
) -> ChronicleResult<Vec<ShardInfo>> {
    let read_dir = match fs::read_dir(audit_dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ChronicleError::ShardRead {
                path: audit_dir.display().to_string(),
                reason: e.to_string(),
            })
        }
    };

    let mut shards = Vec::new();
    for dent in read_dir {
        let dent = dent.map_err(|e| ChronicleError::ShardRead {
            path: audit_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let name = dent.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some((session_id, date)) = parse_shard_name(name) else {
            continue;
        };
        if !sessions.is_empty() && !sessions.iter().any(|s| *s == session_id) {
            continue;
        }

        let meta = dent.metadata().ok();
        shards.push(ShardInfo {
            path: dent.path(),
            session_id,
            date,
            size_bytes: meta.as_ref().map_or(0, |m| m.len()),
            modified: meta.and_then(|m| m.modified().ok()),
        });
    }

    shards.sort_by(|a, b| (a.date, &a.session_id).cmp(&(b.date, &b.session_id)));
    debug!(
        dir = %audit_dir.display(),
        count = shards.len(),
        "discovered audit shards"
    );
    Ok(shards)
}

/// List every shard in the audit directory, for operator visibility.
pub fn list_shards(audit_dir: &Path) -> ChronicleResult<Vec<ShardInfo>> {
    discover_shards(audit_dir, &[])
}

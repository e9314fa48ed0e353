//! Retention: relocating expired shards to cold storage.
//!
//! Age is judged from the date in the shard's filename, never from mtime,
//! so retention decisions survive file copies.  Qualifying shards are moved
//! (`fs::rename`, never copy-then-delete) into the archive root with their
//! filenames preserved.  The sweep is idempotent: a second run finds the
//! archived shards gone from the source directory and does nothing.
//!
//! The cutoff is a calendar date strictly in the past, so the active shard
//! (today's, possibly mid-append) is never a candidate.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use chronicle_contracts::{ChronicleError, ChronicleResult};

use crate::discover::list_shards;

/// The result of attempting to archive one shard.
///
/// Per-shard failures are data, not errors: one immovable shard must not
/// abort the rest of the sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveOutcome {
    /// Shard filename (identical in source and archive).
    pub shard: String,
    /// True when the shard was moved by this run.
    pub archived: bool,
    /// The move failure, if any.
    pub error: Option<String>,
}

/// Moves expired shards from the audit directory to an archive root.
pub struct RetentionManager {
    audit_dir: PathBuf,
    archive_dir: PathBuf,
}

impl RetentionManager {
    pub fn new(audit_dir: impl Into<PathBuf>, archive_dir: impl Into<PathBuf>) -> Self {
        Self {
            audit_dir: audit_dir.into(),
            archive_dir: archive_dir.into(),
        }
    }

    /// Archive every shard whose filename date is strictly before `cutoff`.
    ///
    /// Returns one `ArchiveOutcome` per candidate shard.  Shards within the
    /// retention window are not touched and do not appear in the outcomes.
    /// Fails outright only when the shard listing or the archive directory
    /// itself cannot be produced.
    pub fn archive_expired(&self, cutoff: NaiveDate) -> ChronicleResult<Vec<ArchiveOutcome>> {
        let shards = list_shards(&self.audit_dir)?;
        let expired: Vec<_> = shards.into_iter().filter(|s| s.date < cutoff).collect();
        if expired.is_empty() {
            return Ok(Vec::new());
        }

        fs::create_dir_all(&self.archive_dir).map_err(|e| ChronicleError::Retention {
            reason: format!(
                "cannot create archive dir '{}': {}",
                self.archive_dir.display(),
                e
            ),
        })?;

        let mut outcomes = Vec::with_capacity(expired.len());
        for shard in expired {
            let name = shard
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| shard.path.display().to_string());
            let dest = self.archive_dir.join(&name);

            match fs::rename(&shard.path, &dest) {
                Ok(()) => {
                    info!(shard = %name, dest = %dest.display(), "shard archived");
                    outcomes.push(ArchiveOutcome {
                        shard: name,
                        archived: true,
                        error: None,
                    });
                }
                Err(e) => {
                    warn!(shard = %name, error = %e, "shard archive failed");
                    outcomes.push(ArchiveOutcome {
                        shard: name,
                        archived: false,
                        error: Some(e.to_string()),
                    });
                }
            }
        }
        Ok(outcomes)
    }
}

/// Derive the archive cutoff from a retention window in days.
///
/// `retention_days = 30` keeps today and the 30 days before it; anything
/// dated earlier is eligible for archive.
pub fn cutoff_from_days(retention_days: u32, today: NaiveDate) -> NaiveDate {
    today - chrono::Duration::days(i64::from(retention_days))
}

//! The append-only shard writer.
//!
//! One `AuditWriter` owns one session's chain state — the last assigned
//! sequence number and the last entry's checksum.  Methods take `&mut self`,
//! so "single writer per session" is a property of ownership rather than a
//! documentation rule: whoever holds the handle is the writer.
//!
//! Appends go to `<session_id>-<today>.jsonl` in the audit directory, one
//! JSON line per entry.  The file is opened in append mode on every call,
//! which makes day rollover automatic: the first append after midnight UTC
//! simply lands in the next day's file.  In-memory state advances only
//! after the line has been durably written, so a failed append leaves the
//! chain consistent for retry.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, info, warn};

use chronicle_contracts::{
    parse_shard_name, shard_file_name, AuditEntry, AuditEvent, ChronicleError, ChronicleResult,
};

use crate::chain::{cap_payload, entry_checksum, GENESIS_PREV};

/// Append-only writer for one session's audit chain.
pub struct AuditWriter {
    audit_dir: PathBuf,
    session_id: String,
    last_seq: u64,
    last_checksum: String,
}

impl AuditWriter {
    /// Open a writer for `session_id`, recovering chain state from disk.
    ///
    /// Creates the audit directory if needed.  If shards for this session
    /// already exist, the tail of the newest one is read back to recover
    /// `(last_seq, last_checksum)` — a restart continues the chain instead
    /// of restarting it.  A trailing partial line left by a crash
    /// mid-append was never a committed entry (readers already treat it as
    /// absent), so recovery trims it; a complete final entry that is
    /// merely missing its newline is sealed with one.  Either way the next
    /// append starts on a fresh line instead of fusing with leftover
    /// bytes.
    pub fn open(audit_dir: impl Into<PathBuf>, session_id: impl Into<String>) -> ChronicleResult<Self> {
        let audit_dir = audit_dir.into();
        let session_id = session_id.into();

        fs::create_dir_all(&audit_dir).map_err(|e| ChronicleError::Append {
            session: session_id.clone(),
            reason: format!("cannot create audit dir '{}': {}", audit_dir.display(), e),
        })?;

        let mut writer = Self {
            audit_dir,
            session_id,
            last_seq: 0,
            last_checksum: GENESIS_PREV.to_string(),
        };
        writer.recover_tail()?;
        Ok(writer)
    }

    /// The session this writer appends for.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The sequence number of the last appended entry (0 before the first).
    pub fn last_sequence(&self) -> u64 {
        self.last_seq
    }

    /// Append one event as the next chained entry.
    ///
    /// Stamps the current UTC time, assigns `sequence_num = last + 1` and
    /// `prev_hash = last checksum`, computes the checksum, and writes
    /// exactly one `\n`-terminated JSON line.  Returns the entry as
    /// persisted.  On failure nothing is committed: sequence and checksum
    /// state are untouched, so a retry produces a consistent next entry.
    pub fn append(&mut self, event: AuditEvent) -> ChronicleResult<AuditEntry> {
        let timestamp = Utc::now();

        let mut entry = AuditEntry {
            timestamp,
            session_id: self.session_id.clone(),
            event_type: event.event_type,
            actor: event.actor,
            target: event.target,
            payload: cap_payload(event.payload),
            sequence_num: self.last_seq + 1,
            prev_hash: self.last_checksum.clone(),
            checksum: String::new(),
        };
        entry.checksum = entry_checksum(&entry);

        let line = serde_json::to_string(&entry).map_err(|e| ChronicleError::Append {
            session: self.session_id.clone(),
            reason: format!("cannot serialize entry: {}", e),
        })?;

        let path = self.shard_path_for(timestamp.date_naive());
        self.append_line(&path, &line)?;

        // Durable append confirmed — only now advance the chain state.
        self.last_seq = entry.sequence_num;
        self.last_checksum = entry.checksum.clone();

        debug!(
            session = %self.session_id,
            seq = entry.sequence_num,
            event_type = %entry.event_type,
            target = %entry.target,
            "audit entry appended"
        );

        Ok(entry)
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn shard_path_for(&self, date: chrono::NaiveDate) -> PathBuf {
        self.audit_dir.join(shard_file_name(&self.session_id, date))
    }

    fn append_line(&self, path: &Path, line: &str) -> ChronicleResult<()> {
        let err = |e: std::io::Error| ChronicleError::Append {
            session: self.session_id.clone(),
            reason: format!("write to '{}' failed: {}", path.display(), e),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(err)?;
        file.write_all(line.as_bytes()).map_err(err)?;
        file.write_all(b"\n").map_err(err)?;
        // fsync, not just flush: the chain state must only advance once
        // the entry survives power loss.
        file.sync_all().map_err(err)?;
        Ok(())
    }

    /// Recover `(last_seq, last_checksum)` from the newest existing shard.
    ///
    /// Also repairs the shard's tail: bytes after the last complete entry
    /// (a crashed append's partial line) are trimmed, and a complete final
    /// entry missing its terminating newline gets one.  Without this, the
    /// next append-mode write would land on the same line as the leftover
    /// bytes and fuse into one unparseable record.
    fn recover_tail(&mut self) -> ChronicleResult<()> {
        let Some(newest) = self.newest_shard()? else {
            return Ok(());
        };
        let shard_err = |e: std::io::Error| ChronicleError::ShardRead {
            path: newest.display().to_string(),
            reason: e.to_string(),
        };

        let file = File::open(&newest).map_err(shard_err)?;
        let file_len = file.metadata().map_err(shard_err)?.len();

        let mut tail: Option<AuditEntry> = None;
        // Byte offset just past the last complete entry's newline.
        let mut committed_end: u64 = 0;
        let mut offset: u64 = 0;
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(shard_err)?;
            offset += line.len() as u64 + 1;
            match serde_json::from_str::<AuditEntry>(&line) {
                Ok(entry) => {
                    tail = Some(entry);
                    committed_end = offset;
                }
                Err(e) => {
                    // A crashed append can leave a truncated final line;
                    // readers treat it as absent, so recovery does too.
                    warn!(
                        shard = %newest.display(),
                        line = idx + 1,
                        error = %e,
                        "skipping unparseable line during tail recovery"
                    );
                }
            }
        }

        if committed_end > file_len {
            // The last entry is complete JSON but its newline never made
            // it to disk.  Seal it so the next append starts a new line.
            warn!(
                shard = %newest.display(),
                "sealing unterminated final entry"
            );
            let mut file = OpenOptions::new()
                .append(true)
                .open(&newest)
                .map_err(shard_err)?;
            file.write_all(b"\n").map_err(shard_err)?;
            file.sync_all().map_err(shard_err)?;
        } else if committed_end < file_len {
            // Partial trailing line: never a committed entry, so trim it
            // rather than letting the next append fuse with it.
            warn!(
                shard = %newest.display(),
                trimmed_bytes = file_len - committed_end,
                "trimming partial trailing line left by a crashed append"
            );
            let file = OpenOptions::new()
                .write(true)
                .open(&newest)
                .map_err(shard_err)?;
            file.set_len(committed_end).map_err(shard_err)?;
            file.sync_all().map_err(shard_err)?;
        }

        if let Some(entry) = tail {
            info!(
                session = %self.session_id,
                seq = entry.sequence_num,
                shard = %newest.display(),
                "recovered writer state from shard tail"
            );
            self.last_seq = entry.sequence_num;
            self.last_checksum = entry.checksum;
        }
        Ok(())
    }

    /// Find this session's newest shard by filename date, if any exist.
    fn newest_shard(&self) -> ChronicleResult<Option<PathBuf>> {
        let read_dir = fs::read_dir(&self.audit_dir).map_err(|e| ChronicleError::ShardRead {
            path: self.audit_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut newest: Option<(chrono::NaiveDate, PathBuf)> = None;
        for dent in read_dir {
            let dent = dent.map_err(|e| ChronicleError::ShardRead {
                path: self.audit_dir.display().to_string(),
                reason: e.to_string(),
            })?;
            let name = dent.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some((session, date)) = parse_shard_name(name) else {
                continue;
            };
            if session != self.session_id {
                continue;
            }
            if newest.as_ref().map_or(true, |(d, _)| date > *d) {
                newest = Some((date, dent.path()));
            }
        }
        Ok(newest.map(|(_, path)| path))
    }
}

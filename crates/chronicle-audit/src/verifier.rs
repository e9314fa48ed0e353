//! Strict chain verification.
//!
//! The verifier replays shards end-to-end, recomputing every checksum and
//! validating chain linkage and sequence continuity.  Tamper findings are
//! the verifier's *successful output*, not errors: a report with
//! `valid = false` pinpoints the first failing entry and the check it
//! failed, and nothing is ever repaired.
//!
//! Unlike the searcher, the verifier is strict about decoding: integrity is
//! exactly the property under test, so an unparseable line invalidates the
//! shard rather than being skipped.
//!
//! Verification is read-only and safe to run while a writer appends to a
//! *different* shard.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use chronicle_contracts::{
    parse_shard_name, AuditEntry, ChronicleError, ChronicleResult,
};

use crate::chain::{entry_checksum, GENESIS_PREV};

/// Which integrity check an entry failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The stored checksum does not match the recomputed one — the entry's
    /// own fields were modified after writing.
    ChecksumMismatch,
    /// The stored `prev_hash` does not match the previous entry's checksum.
    BrokenChain,
    /// The sequence number is not the expected successor — an entry was
    /// removed, duplicated, or injected.
    SequenceGap,
    /// The line could not be decoded as an entry at all.
    MalformedEntry,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ChecksumMismatch => "checksum_mismatch",
            Self::BrokenChain => "broken_chain",
            Self::SequenceGap => "sequence_gap",
            Self::MalformedEntry => "malformed_entry",
        };
        write!(f, "{}", s)
    }
}

/// The first point of failure found in a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainFailure {
    /// The shard containing the failing entry.
    pub shard: PathBuf,
    /// 1-based line number of the failing entry within its shard.
    pub line: usize,
    /// Which check failed.
    pub kind: FailureKind,
    /// Human-readable explanation with the expected/actual values.
    pub detail: String,
}

/// The outcome of verifying a shard or a whole session chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// True when every entry passed every check.
    pub valid: bool,
    /// Entries that passed before verification stopped.
    pub entries_checked: u64,
    /// The first failure, when `valid` is false.
    pub failure: Option<ChainFailure>,
}

impl VerificationReport {
    fn valid(entries_checked: u64) -> Self {
        Self {
            valid: true,
            entries_checked,
            failure: None,
        }
    }

    fn invalid(entries_checked: u64, failure: ChainFailure) -> Self {
        Self {
            valid: false,
            entries_checked,
            failure: Some(failure),
        }
    }
}

/// Carried chain expectations, threaded across shard boundaries.
///
/// Shard boundaries are an artifact of storage layout, not of the logical
/// chain: the last entry of one day's shard is the predecessor of the first
/// entry of the next day's.
struct ChainState {
    expected_prev: String,
    expected_seq: u64,
}

impl ChainState {
    fn genesis() -> Self {
        Self {
            expected_prev: GENESIS_PREV.to_string(),
            expected_seq: 1,
        }
    }

    /// Check one entry against expectations; advance on success.
    fn check(&mut self, entry: &AuditEntry) -> Result<(), (FailureKind, String)> {
        let recomputed = entry_checksum(entry);
        if entry.checksum != recomputed {
            return Err((
                FailureKind::ChecksumMismatch,
                format!(
                    "stored checksum {} != recomputed {}",
                    entry.checksum, recomputed
                ),
            ));
        }
        if entry.prev_hash != self.expected_prev {
            return Err((
                FailureKind::BrokenChain,
                format!(
                    "prev_hash '{}' does not match previous entry's checksum '{}'",
                    entry.prev_hash, self.expected_prev
                ),
            ));
        }
        if entry.sequence_num != self.expected_seq {
            return Err((
                FailureKind::SequenceGap,
                format!(
                    "sequence_num {} but expected {}",
                    entry.sequence_num, self.expected_seq
                ),
            ));
        }

        self.expected_prev = entry.checksum.clone();
        self.expected_seq += 1;
        Ok(())
    }
}

/// Verify a single shard in isolation.
///
/// The shard's first entry is expected to open the chain (`prev_hash`
/// empty, `sequence_num` 1) — for shards past a session's first day, use
/// [`verify_session`], which threads expectations across shards.
pub fn verify_shard(path: &Path) -> ChronicleResult<VerificationReport> {
    let mut state = ChainState::genesis();
    let mut checked = 0;
    verify_file(path, &mut state, &mut checked)
}

/// Verify a session's entire logical chain across all of its shards.
///
/// Discovers every shard for `session_id` under `audit_dir`, orders them
/// by filename date, and replays them as one chain.  Returns an error only
/// when no shards exist or a shard cannot be read at all; tamper findings
/// come back in the report.
pub fn verify_session(audit_dir: &Path, session_id: &str) -> ChronicleResult<VerificationReport> {
    let mut shards: Vec<(chrono::NaiveDate, PathBuf)> = Vec::new();
    let read_dir = std::fs::read_dir(audit_dir).map_err(|e| ChronicleError::ShardRead {
        path: audit_dir.display().to_string(),
        reason: e.to_string(),
    })?;
    for dent in read_dir {
        let dent = dent.map_err(|e| ChronicleError::ShardRead {
            path: audit_dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let name = dent.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some((session, date)) = parse_shard_name(name) {
            if session == session_id {
                shards.push((date, dent.path()));
            }
        }
    }
    if shards.is_empty() {
        return Err(ChronicleError::ShardRead {
            path: audit_dir.display().to_string(),
            reason: format!("no shards found for session '{}'", session_id),
        });
    }
    shards.sort_by_key(|(date, _)| *date);

    let mut state = ChainState::genesis();
    let mut checked = 0;
    for (date, path) in &shards {
        debug!(session = %session_id, date = %date, shard = %path.display(), "verifying shard");
        let report = verify_file(path, &mut state, &mut checked)?;
        if !report.valid {
            return Ok(report);
        }
    }

    info!(
        session = %session_id,
        shards = shards.len(),
        entries = checked,
        "session chain verified"
    );
    Ok(VerificationReport::valid(checked))
}

/// Replay one file against the carried chain state.
fn verify_file(
    path: &Path,
    state: &mut ChainState,
    checked: &mut u64,
) -> ChronicleResult<VerificationReport> {
    let file = File::open(path).map_err(|e| ChronicleError::ShardRead {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| ChronicleError::ShardRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }

        let entry: AuditEntry = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(e) => {
                return Ok(VerificationReport::invalid(
                    *checked,
                    ChainFailure {
                        shard: path.to_path_buf(),
                        line: idx + 1,
                        kind: FailureKind::MalformedEntry,
                        detail: format!("cannot decode entry: {}", e),
                    },
                ));
            }
        };

        if let Err((kind, detail)) = state.check(&entry) {
            return Ok(VerificationReport::invalid(
                *checked,
                ChainFailure {
                    shard: path.to_path_buf(),
                    line: idx + 1,
                    kind,
                    detail,
                },
            ));
        }
        *checked += 1;
    }

    Ok(VerificationReport::valid(*checked))
}

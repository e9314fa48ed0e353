//! Error types for the Chronicle audit trail.
//!
//! All fallible operations in the Chronicle crates return
//! `ChronicleResult<T>`.  Error variants carry the shard path, entry
//! position, or reason needed to diagnose a failure without re-running it —
//! audit tooling exists precisely so failures are explainable.

use thiserror::Error;

/// The unified error type for the Chronicle crates.
#[derive(Debug, Error)]
pub enum ChronicleError {
    /// An entry could not be durably appended to its shard.
    ///
    /// In-memory writer state (sequence counter, last checksum) is never
    /// advanced when this is returned, so a retry produces a consistent
    /// next entry.
    #[error("audit append failed for session '{session}': {reason}")]
    Append { session: String, reason: String },

    /// A shard file could not be opened or read.
    #[error("cannot read shard '{path}': {reason}")]
    ShardRead { path: String, reason: String },

    /// A shard line could not be decoded as an audit entry.
    ///
    /// The searcher skips these; the verifier treats them as invalidating
    /// the shard.
    #[error("malformed entry at {path}:{line}: {reason}")]
    MalformedEntry {
        path: String,
        line: usize,
        reason: String,
    },

    /// A query was rejected before any shard was scanned.
    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },

    /// A query result could not be rendered to the requested format.
    #[error("export failed: {reason}")]
    Export { reason: String },

    /// The retention manager could not process the archive root itself.
    ///
    /// Per-shard move failures are NOT errors — they are reported in each
    /// shard's `ArchiveOutcome` so one bad shard never aborts the sweep.
    #[error("retention failed: {reason}")]
    Retention { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

/// Convenience alias used throughout the Chronicle crates.
pub type ChronicleResult<T> = Result<T, ChronicleError>;

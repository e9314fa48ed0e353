//! # chronicle-audit
//!
//! Append-only, SHA-256 hash-chained audit shards for the Chronicle
//! orchestrator.
//!
//! ## Overview
//!
//! Every significant orchestration action is persisted by [`AuditWriter`]
//! as one JSON line in a per-session, per-day shard file.  Each entry
//! links to its predecessor via `prev_hash` and carries a gapless,
//! 1-based `sequence_num` — modifying, removing, or injecting any entry
//! after the fact is detected by [`verify_shard`] / [`verify_session`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chronicle_audit::{AuditWriter, verify_session};
//! use chronicle_contracts::{Actor, AuditEvent, EventType};
//!
//! let mut writer = AuditWriter::open(audit_dir, "sess-1")?;
//! writer.append(AuditEvent::new(EventType::Command, Actor::User, "pane-0"))?;
//!
//! let report = verify_session(audit_dir, "sess-1")?;
//! assert!(report.valid);
//! ```

pub mod chain;
pub mod verifier;
pub mod writer;

pub use chain::{cap_payload, entry_checksum, GENESIS_PREV, MAX_PAYLOAD_BYTES};
pub use verifier::{
    verify_session, verify_shard, ChainFailure, FailureKind, VerificationReport,
};
pub use writer::AuditWriter;

// ── Tests ─────────────────────────────────────────────────────────────────────

//! Hash-chain primitives: canonical serialization and the checksum rule.
//!
//! An entry's checksum is `SHA256(serialize(entry with checksum = ""))`,
//! hex-encoded.  Serialization is deterministic: struct fields serialize in
//! declaration order and the payload map is a `BTreeMap`, so two equal
//! entries always produce identical bytes.  The checksum is taken only after
//! `sequence_num` and `prev_hash` have been assigned, which is what links
//! each entry to its predecessor.

use sha2::{Digest, Sha256};

use chronicle_contracts::{AuditEntry, Payload};

/// The `prev_hash` of the first entry in every session chain.
pub const GENESIS_PREV: &str = "";

/// Serialized-payload size cap, in bytes.
///
/// Payloads above this are replaced with a truncation marker before the
/// entry is chained, so the checksum commits to exactly what is stored and
/// hashing cost stays bounded regardless of what the orchestrator attaches.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Compute the checksum for an entry.
///
/// The stored `checksum` field is ignored: the digest covers the entry
/// serialized with `checksum` cleared to the empty string.  Returns a
/// lowercase 64-character hex string.
///
/// # Panics
///
/// Panics if the entry cannot be serialized to JSON, which cannot happen
/// for the well-formed `AuditEntry` type.
pub fn entry_checksum(entry: &AuditEntry) -> String {
    let mut canonical = entry.clone();
    canonical.checksum = String::new();

    let bytes = serde_json::to_vec(&canonical)
        .expect("AuditEntry must always be serializable to JSON");

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    hex::encode(hasher.finalize())
}

/// Enforce the payload size cap.
///
/// Returns the payload unchanged when its serialized form fits within
/// `MAX_PAYLOAD_BYTES`; otherwise returns a marker map recording that
/// truncation happened and how large the original was.
pub fn cap_payload(payload: Payload) -> Payload {
    let size = serde_json::to_vec(&payload).map(|b| b.len()).unwrap_or(0);
    if size <= MAX_PAYLOAD_BYTES {
        return payload;
    }

    let mut marker = Payload::new();
    marker.insert("payload_truncated".to_string(), serde_json::json!(true));
    marker.insert("original_bytes".to_string(), serde_json::json!(size));
    marker
}

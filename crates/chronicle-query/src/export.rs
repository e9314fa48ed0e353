//! Query result export.
//!
//! Two portable renderings: structured JSON (the full `QueryResult` shape,
//! one-to-one except that oversized payloads are replaced by a truncation
//! marker) and flat CSV with the fixed column set
//! `timestamp,session_id,event_type,actor,target,sequence_num`.

use std::fmt::Write as _;
use std::str::FromStr;

use chronicle_contracts::{AuditEntry, ChronicleError, ChronicleResult, QueryResult};

/// Serialized-payload cap for structured export, in bytes.
///
/// Matches the spirit of the writer's chain-side cap: exports stay bounded
/// even if older shards predate payload capping.
pub const MAX_EXPORT_PAYLOAD_BYTES: usize = 64 * 1024;

/// The formats the exporter can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = ChronicleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(ChronicleError::Export {
                reason: format!("unknown export format '{}' (expected 'json' or 'csv')", other),
            }),
        }
    }
}

/// Render a query result in the requested format.
pub fn export(result: &QueryResult, format: ExportFormat) -> ChronicleResult<String> {
    match format {
        ExportFormat::Json => to_json(result),
        ExportFormat::Csv => Ok(to_csv(&result.entries)),
    }
}

/// Structured export: the exact `QueryResult` shape, pretty-printed.
///
/// Every field round-trips except oversized payloads, which are replaced
/// with `{"payload_truncated": true, "original_bytes": N}`.
pub fn to_json(result: &QueryResult) -> ChronicleResult<String> {
    let mut bounded = result.clone();
    for entry in &mut bounded.entries {
        let size = serde_json::to_vec(&entry.payload).map(|b| b.len()).unwrap_or(0);
        if size > MAX_EXPORT_PAYLOAD_BYTES {
            let mut marker = chronicle_contracts::Payload::new();
            marker.insert("payload_truncated".to_string(), serde_json::json!(true));
            marker.insert("original_bytes".to_string(), serde_json::json!(size));
            entry.payload = marker;
        }
    }
    serde_json::to_string_pretty(&bounded).map_err(|e| ChronicleError::Export {
        reason: format!("cannot serialize query result: {}", e),
    })
}

/// CSV header used by [`to_csv`].
pub const CSV_HEADER: &str = "timestamp,session_id,event_type,actor,target,sequence_num";

/// Flat export: one row per entry, RFC-4180-style escaping.
pub fn to_csv(entries: &[AuditEntry]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for entry in entries {
        // write! to a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{},{},{}",
            csv_escape(&entry.timestamp.to_rfc3339()),
            csv_escape(&entry.session_id),
            csv_escape(&entry.event_type.to_string()),
            csv_escape(&entry.actor.to_string()),
            csv_escape(&entry.target),
            entry.sequence_num,
        );
    }
    out
}

/// Quote a field when it contains a separator, quote, or newline; embedded
/// quotes are doubled.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

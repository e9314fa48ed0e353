//! Query and result types for the audit search engine.
//!
//! A `Query` is a read-only filter specification; all filters are applied
//! conjunctively (AND).  `QueryResult` is the exact shape returned to
//! callers and round-trips through serde unchanged.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    entry::{Actor, AuditEntry, EventType},
    error::{ChronicleError, ChronicleResult},
};

/// A read-only filter specification for one search.
///
/// Empty vectors mean "any"; `None` options mean "unfiltered".
/// `limit == 0` means unbounded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Query {
    /// Restrict to these sessions.  Empty = all sessions.
    #[serde(default)]
    pub sessions: Vec<String>,
    /// Restrict to these event types.  Empty = all types.
    #[serde(default)]
    pub event_types: Vec<EventType>,
    /// Restrict to these actors.  Empty = all actors.
    #[serde(default)]
    pub actors: Vec<Actor>,
    /// Wildcard pattern (`*`, `?`) matched against the full `target` field.
    #[serde(default)]
    pub target_glob: Option<String>,
    /// Regex matched against a rendered one-line form of each entry.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Only entries with `timestamp >= since` (inclusive).
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    /// Only entries with `timestamp < until` (exclusive).
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    /// Maximum entries returned.  0 = unlimited.
    #[serde(default)]
    pub limit: usize,
}

/// The outcome of one search.
///
/// `total_count` counts every match found over the full scan, even when
/// `limit` truncates `entries` — the scan does not stop early, so the
/// count is the total available, not the total seen before truncation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Matching entries, bounded by `Query::limit`, in shard/append order.
    pub entries: Vec<AuditEntry>,
    /// Matches found across the full scan, regardless of `limit`.
    pub total_count: u64,
    /// Entries examined (parsed) across all scanned shards.
    pub scanned: u64,
    /// Wall-clock scan duration in milliseconds.
    pub duration_ms: u64,
    /// True when `limit` withheld at least one match from `entries`.
    pub truncated: bool,
}

/// Parse a time specification from operator input.
///
/// Accepts either an absolute RFC3339 instant (`2026-08-01T00:00:00Z`) or a
/// relative duration before `now` in the form `<n><unit>` with unit one of
/// `s`, `m`, `h`, `d`, `w` — `"1h"` means one hour ago, `"7d"` seven days.
pub fn parse_time_spec(spec: &str, now: DateTime<Utc>) -> ChronicleResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(spec) {
        return Ok(ts.with_timezone(&Utc));
    }

    let spec = spec.trim();
    let Some((unit_at, _)) = spec.char_indices().last() else {
        return Err(ChronicleError::InvalidQuery {
            reason: "empty time spec".to_string(),
        });
    };
    let (num_part, unit) = spec.split_at(unit_at);
    let n: i64 = num_part.parse().map_err(|_| ChronicleError::InvalidQuery {
        reason: format!("cannot parse time spec '{}' (expected RFC3339 or e.g. '1h', '7d')", spec),
    })?;
    if n < 0 {
        return Err(ChronicleError::InvalidQuery {
            reason: format!("time spec '{}' must not be negative", spec),
        });
    }
    let delta = match unit {
        "s" => Duration::seconds(n),
        "m" => Duration::minutes(n),
        "h" => Duration::hours(n),
        "d" => Duration::days(n),
        "w" => Duration::weeks(n),
        other => {
            return Err(ChronicleError::InvalidQuery {
                reason: format!("unknown time unit '{}' in '{}'", other, spec),
            })
        }
    };
    Ok(now - delta)
}

//! The streaming cross-shard query engine.
//!
//! A search validates its query up front (bad input never starts a scan),
//! discovers candidate shards by session and filename date, then streams
//! each shard line-by-line, applying every filter conjunctively.  Shards
//! are never loaded whole — memory use is bounded by the result set, not by
//! history size.
//!
//! The searcher is deliberately lenient where the verifier is strict: a
//! malformed line (typically a partial write from a crash mid-append) is
//! skipped with a debug log, never fatal.  Integrity questions belong to
//! the verifier.
//!
//! Counting semantics: the scan always runs to completion, so
//! `total_count` is the total number of matches available, not the number
//! seen before `limit` filled up.  `entries` holds at most `limit` matches
//! and `truncated` flags that some were withheld.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use regex::Regex;
use tracing::{debug, info};

use chronicle_contracts::{
    AuditEntry, ChronicleError, ChronicleResult, Query, QueryResult,
};

use crate::discover::discover_shards;

/// Match `text` against a wildcard pattern.
///
/// `*` matches any run of characters (including empty), `?` matches exactly
/// one; everything else is literal.  The whole string must match.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    // Classic two-pointer scan with backtracking to the last `*`.
    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Compiled, validated form of a `Query`, built before any shard is read.
struct CompiledQuery<'q> {
    query: &'q Query,
    pattern: Option<Regex>,
}

impl<'q> CompiledQuery<'q> {
    /// Validate the query; invalid input is rejected before any scan.
    fn compile(query: &'q Query) -> ChronicleResult<Self> {
        if let (Some(since), Some(until)) = (query.since, query.until) {
            if since > until {
                return Err(ChronicleError::InvalidQuery {
                    reason: format!("since ({}) is after until ({})", since, until),
                });
            }
        }
        let pattern = query
            .pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ChronicleError::InvalidQuery {
                reason: format!("bad search pattern: {}", e),
            })?;
        Ok(Self { query, pattern })
    }

    /// All filters, conjunctively.  Time window is `since <= ts < until`.
    fn matches(&self, entry: &AuditEntry) -> bool {
        let q = self.query;
        if !q.sessions.is_empty() && !q.sessions.iter().any(|s| *s == entry.session_id) {
            return false;
        }
        if !q.event_types.is_empty() && !q.event_types.contains(&entry.event_type) {
            return false;
        }
        if !q.actors.is_empty() && !q.actors.contains(&entry.actor) {
            return false;
        }
        if let Some(glob) = &q.target_glob {
            if !glob_match(glob, &entry.target) {
                return false;
            }
        }
        if let Some(since) = q.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = q.until {
            if entry.timestamp >= until {
                return false;
            }
        }
        if let Some(re) = &self.pattern {
            if !re.is_match(&entry.render()) {
                return false;
            }
        }
        true
    }
}

/// The cross-shard audit query engine.
pub struct Searcher {
    audit_dir: PathBuf,
}

impl Searcher {
    /// Create a searcher over the given audit directory.
    pub fn new(audit_dir: impl Into<PathBuf>) -> Self {
        Self {
            audit_dir: audit_dir.into(),
        }
    }

    /// Answer `query` against every relevant shard.
    ///
    /// Shards are visited in `(date, session)` order, and entries within a
    /// shard in append order, so results for one session come back
    /// chronologically.  Errors are returned only for invalid queries and
    /// unreadable shards; damaged lines inside a readable shard are
    /// skipped.
    pub fn search(&self, query: &Query) -> ChronicleResult<QueryResult> {
        let compiled = CompiledQuery::compile(query)?;
        let started = Instant::now();

        let shards = discover_shards(&self.audit_dir, &query.sessions)?;

        let mut entries: Vec<AuditEntry> = Vec::new();
        let mut total_count: u64 = 0;
        let mut scanned: u64 = 0;

        for shard in &shards {
            let file = File::open(&shard.path).map_err(|e| ChronicleError::ShardRead {
                path: shard.path.display().to_string(),
                reason: e.to_string(),
            })?;

            for (idx, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|e| ChronicleError::ShardRead {
                    path: shard.path.display().to_string(),
                    reason: e.to_string(),
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                let entry: AuditEntry = match serde_json::from_str(&line) {
                    Ok(entry) => entry,
                    Err(e) => {
                        // Lenient by design: a damaged trailing line must
                        // not make the rest of the history unsearchable.
                        debug!(
                            shard = %shard.path.display(),
                            line = idx + 1,
                            error = %e,
                            "skipping malformed shard line"
                        );
                        continue;
                    }
                };
                scanned += 1;

                if compiled.matches(&entry) {
                    total_count += 1;
                    if query.limit == 0 || entries.len() < query.limit {
                        entries.push(entry);
                    }
                }
            }
        }

        let truncated = total_count > entries.len() as u64;
        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            shards = shards.len(),
            scanned,
            total_count,
            returned = entries.len(),
            truncated,
            duration_ms,
            "audit search complete"
        );

        Ok(QueryResult {
            entries,
            total_count,
            scanned,
            duration_ms,
            truncated,
        })
    }
}

//! # chronicle-query
//!
//! Read-path tooling for Chronicle audit shards: cross-shard search,
//! portable export, and retention archival.
//!
//! ## Overview
//!
//! The [`Searcher`] answers a [`Query`](chronicle_contracts::Query) by
//! streaming every relevant shard and applying all filters conjunctively;
//! [`export`] renders the result as JSON or CSV; [`RetentionManager`]
//! relocates shards past the retention window into cold storage.  All of
//! it is read-only with respect to live shards — the only mutation is the
//! whole-file rename performed by retention on closed shards.

pub mod discover;
pub mod export;
pub mod retention;
pub mod search;

pub use discover::{discover_shards, list_shards};
pub use export::{export, to_csv, to_json, ExportFormat, CSV_HEADER};
pub use retention::{cutoff_from_days, ArchiveOutcome, RetentionManager};
pub use search::{glob_match, Searcher};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    use chronicle_audit::entry_checksum;
    use chronicle_contracts::{
        shard_file_name, Actor, AuditEntry, EventType, Payload, Query,
    };

    use super::*;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 20, 12, 0, 0).unwrap()
    }

    /// Write a valid chained shard for `session` from `(type, actor,
    /// target, minutes-after-base)` specs, starting at `start_seq`.
    fn build_shard(
        dir: &Path,
        session: &str,
        date: NaiveDate,
        start_seq: u64,
        prev: &str,
        specs: &[(EventType, Actor, &str, i64)],
    ) -> String {
        let mut prev = prev.to_string();
        let mut out = String::new();
        for (i, (event_type, actor, target, offset_min)) in specs.iter().enumerate() {
            let mut entry = AuditEntry {
                timestamp: base_time() + Duration::minutes(*offset_min),
                session_id: session.to_string(),
                event_type: *event_type,
                actor: *actor,
                target: (*target).to_string(),
                payload: Payload::new(),
                sequence_num: start_seq + i as u64,
                prev_hash: prev.clone(),
                checksum: String::new(),
            };
            entry.checksum = entry_checksum(&entry);
            prev = entry.checksum.clone();
            out.push_str(&serde_json::to_string(&entry).unwrap());
            out.push('\n');
        }
        fs::write(dir.join(shard_file_name(session, date)), out).unwrap();
        prev
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    /// The six-entry mixed scenario used across the filter tests:
    /// types {command×2, spawn, send, response, error},
    /// actors {user×3, system×2, agent×1}.
    fn scenario_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        build_shard(
            dir.path(),
            "sess-mix",
            day(20),
            1,
            "",
            &[
                (EventType::Command, Actor::User, "pane-0", 0),
                (EventType::Spawn, Actor::System, "pane-1", 1),
                (EventType::Send, Actor::User, "pane-1", 2),
                (EventType::Response, Actor::Agent, "pane-1", 3),
                (EventType::Error, Actor::System, "pane-1", 4),
                (EventType::Command, Actor::User, "pane-0", 5),
            ],
        );
        dir
    }

    // ── Glob matching ─────────────────────────────────────────────────────────

    #[test]
    fn glob_literals_and_wildcards() {
        assert!(glob_match("pane-0", "pane-0"));
        assert!(!glob_match("pane-0", "pane-1"));
        assert!(glob_match("pane-*", "pane-12"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("pane-?", "pane-7"));
        assert!(!glob_match("pane-?", "pane-77"));
        assert!(glob_match("*-1", "pane-1"));
        assert!(glob_match("p*e-*", "pane-3"));
        assert!(!glob_match("pane-*", "window-1"));
        // The match is anchored: a partial match is not a match.
        assert!(!glob_match("pane", "pane-1"));
    }

    // ── Filter correctness ────────────────────────────────────────────────────

    #[test]
    fn event_type_filter_returns_exact_subset() {
        let dir = scenario_dir();
        let searcher = Searcher::new(dir.path());

        let result = searcher
            .search(&Query {
                event_types: vec![EventType::Command],
                ..Query::default()
            })
            .unwrap();

        assert_eq!(result.total_count, 2);
        assert_eq!(result.entries.len(), 2);
        assert!(result
            .entries
            .iter()
            .all(|e| e.event_type == EventType::Command));
        assert_eq!(result.scanned, 6);
        assert!(!result.truncated);
    }

    /// Filters are conjunctive: actor=system AND type=error matches exactly
    /// the one entry carrying both.
    #[test]
    fn combined_filters_are_conjunctive() {
        let dir = scenario_dir();
        let searcher = Searcher::new(dir.path());

        let result = searcher
            .search(&Query {
                actors: vec![Actor::System],
                event_types: vec![EventType::Error],
                ..Query::default()
            })
            .unwrap();

        assert_eq!(result.total_count, 1);
        assert_eq!(result.entries[0].sequence_num, 5);
    }

    /// `limit` bounds `entries` but not `total_count`.
    #[test]
    fn limit_truncates_but_counts_all() {
        let dir = scenario_dir();
        let searcher = Searcher::new(dir.path());

        let result = searcher
            .search(&Query {
                limit: 3,
                ..Query::default()
            })
            .unwrap();

        assert_eq!(result.entries.len(), 3);
        assert_eq!(result.total_count, 6);
        assert!(result.truncated);
        // Bounded results keep append order.
        let seqs: Vec<u64> = result.entries.iter().map(|e| e.sequence_num).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn target_glob_filters() {
        let dir = scenario_dir();
        let searcher = Searcher::new(dir.path());

        let result = searcher
            .search(&Query {
                target_glob: Some("pane-1".to_string()),
                ..Query::default()
            })
            .unwrap();
        assert_eq!(result.total_count, 4);

        let result = searcher
            .search(&Query {
                target_glob: Some("pane-*".to_string()),
                ..Query::default()
            })
            .unwrap();
        assert_eq!(result.total_count, 6);
    }

    #[test]
    fn grep_pattern_matches_rendered_entries() {
        let dir = scenario_dir();
        let searcher = Searcher::new(dir.path());

        // "error" appears in the rendered form of the error entry only.
        let result = searcher
            .search(&Query {
                pattern: Some("\\berror\\b".to_string()),
                ..Query::default()
            })
            .unwrap();
        assert_eq!(result.total_count, 1);
        assert_eq!(result.entries[0].event_type, EventType::Error);
    }

    // ── Time-range semantics ──────────────────────────────────────────────────

    /// `since` is inclusive and `until` is exclusive: `since <= ts < until`.
    #[test]
    fn time_window_boundaries() {
        let dir = scenario_dir();
        let searcher = Searcher::new(dir.path());
        let t2 = base_time() + Duration::minutes(2);
        let t4 = base_time() + Duration::minutes(4);

        // since = exact timestamp of entry 3 → entries 3..=6.
        let result = searcher
            .search(&Query {
                since: Some(t2),
                ..Query::default()
            })
            .unwrap();
        assert_eq!(result.total_count, 4);
        assert_eq!(result.entries[0].sequence_num, 3);

        // until = exact timestamp of entry 5 → entries 1..=4 (exclusive).
        let result = searcher
            .search(&Query {
                until: Some(t4),
                ..Query::default()
            })
            .unwrap();
        assert_eq!(result.total_count, 4);
        assert_eq!(result.entries.last().unwrap().sequence_num, 4);

        // Window [t2, t4) → entries 3 and 4.
        let result = searcher
            .search(&Query {
                since: Some(t2),
                until: Some(t4),
                ..Query::default()
            })
            .unwrap();
        let seqs: Vec<u64> = result.entries.iter().map(|e| e.sequence_num).collect();
        assert_eq!(seqs, vec![3, 4]);
    }

    // ── Fail-fast validation ──────────────────────────────────────────────────

    #[test]
    fn invalid_queries_are_rejected_before_scanning() {
        let dir = scenario_dir();
        let searcher = Searcher::new(dir.path());

        let err = searcher
            .search(&Query {
                pattern: Some("([unclosed".to_string()),
                ..Query::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("invalid query"));

        let err = searcher
            .search(&Query {
                since: Some(base_time() + Duration::hours(1)),
                until: Some(base_time()),
                ..Query::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("after"));
    }

    // ── Leniency and multi-shard ordering ─────────────────────────────────────

    /// A damaged line is skipped; the rest of the shard still matches.
    #[test]
    fn malformed_lines_are_skipped() {
        let dir = scenario_dir();
        let shard = dir.path().join(shard_file_name("sess-mix", day(20)));
        let mut contents = fs::read_to_string(&shard).unwrap();
        contents.push_str("{\"timestamp\": \"2026-08-2");
        fs::write(&shard, contents).unwrap();

        let searcher = Searcher::new(dir.path());
        let result = searcher.search(&Query::default()).unwrap();
        assert_eq!(result.total_count, 6);
        assert_eq!(result.scanned, 6);
    }

    /// Shards are scanned in date order, so a session spanning days comes
    /// back chronologically; session filtering excludes other sessions.
    #[test]
    fn cross_shard_results_are_date_ordered() {
        let dir = TempDir::new().unwrap();
        let tail = build_shard(
            dir.path(),
            "sess-a",
            day(20),
            1,
            "",
            &[(EventType::Command, Actor::User, "pane-0", 0)],
        );
        build_shard(
            dir.path(),
            "sess-a",
            day(21),
            2,
            &tail,
            &[(EventType::SessionEnd, Actor::System, "session", 60 * 24)],
        );
        build_shard(
            dir.path(),
            "sess-b",
            day(20),
            1,
            "",
            &[(EventType::Command, Actor::User, "pane-9", 5)],
        );

        let searcher = Searcher::new(dir.path());
        let result = searcher
            .search(&Query {
                sessions: vec!["sess-a".to_string()],
                ..Query::default()
            })
            .unwrap();

        assert_eq!(result.total_count, 2);
        let seqs: Vec<u64> = result.entries.iter().map(|e| e.sequence_num).collect();
        assert_eq!(seqs, vec![1, 2]);
        assert!(result.entries.iter().all(|e| e.session_id == "sess-a"));
    }

    /// A missing audit directory is an empty history, not an error.
    #[test]
    fn missing_audit_dir_yields_empty_result() {
        let dir = TempDir::new().unwrap();
        let searcher = Searcher::new(dir.path().join("never-created"));
        let result = searcher.search(&Query::default()).unwrap();
        assert_eq!(result.total_count, 0);
        assert!(result.entries.is_empty());
    }

    // ── Export ────────────────────────────────────────────────────────────────

    /// CSV round-trip: re-parsing the rows recovers the identifying fields
    /// of every entry.
    #[test]
    fn csv_round_trips_identifying_fields() {
        let dir = scenario_dir();
        let searcher = Searcher::new(dir.path());
        let result = searcher.search(&Query::default()).unwrap();

        let csv = to_csv(&result.entries);
        let lines: Vec<&str> = csv.trim_end().split('\n').collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.len(), 7);

        for (row, entry) in lines[1..].iter().zip(&result.entries) {
            let cols: Vec<&str> = row.split(',').collect();
            assert_eq!(cols.len(), 6);
            assert_eq!(cols[0], entry.timestamp.to_rfc3339());
            assert_eq!(cols[1], entry.session_id);
            assert_eq!(cols[2], entry.event_type.to_string());
            assert_eq!(cols[3], entry.actor.to_string());
            assert_eq!(cols[4], entry.target);
            assert_eq!(cols[5], entry.sequence_num.to_string());
        }
    }

    /// JSON export is the QueryResult shape, one-to-one.
    #[test]
    fn json_export_round_trips() {
        let dir = scenario_dir();
        let searcher = Searcher::new(dir.path());
        let result = searcher.search(&Query::default()).unwrap();

        let json = to_json(&result).unwrap();
        let decoded: chronicle_contracts::QueryResult = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.total_count, result.total_count);
        assert_eq!(decoded.entries, result.entries);
    }

    // ── Retention ─────────────────────────────────────────────────────────────

    #[test]
    fn retention_archives_only_expired_shards() {
        let dir = TempDir::new().unwrap();
        let audit = dir.path().join("audit");
        let archive = dir.path().join("archive");
        fs::create_dir_all(&audit).unwrap();

        build_shard(
            &audit, "sess-old", day(1), 1, "",
            &[(EventType::Command, Actor::User, "pane-0", 0)],
        );
        build_shard(
            &audit, "sess-new", day(25), 1, "",
            &[(EventType::Command, Actor::User, "pane-0", 0)],
        );

        let manager = RetentionManager::new(&audit, &archive);
        let outcomes = manager.archive_expired(day(10)).unwrap();

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].archived);
        assert_eq!(outcomes[0].shard, shard_file_name("sess-old", day(1)));

        // Moved, filename preserved; fresh shard untouched.
        assert!(archive.join(shard_file_name("sess-old", day(1))).exists());
        assert!(!audit.join(shard_file_name("sess-old", day(1))).exists());
        assert!(audit.join(shard_file_name("sess-new", day(25))).exists());
    }

    /// Re-running the sweep is a no-op: archived shards are gone from the
    /// source directory.
    #[test]
    fn retention_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let audit = dir.path().join("audit");
        let archive = dir.path().join("archive");
        fs::create_dir_all(&audit).unwrap();
        build_shard(
            &audit, "sess-old", day(1), 1, "",
            &[(EventType::Command, Actor::User, "pane-0", 0)],
        );

        let manager = RetentionManager::new(&audit, &archive);
        let first = manager.archive_expired(day(10)).unwrap();
        assert_eq!(first.len(), 1);

        let second = manager.archive_expired(day(10)).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn cutoff_derivation() {
        assert_eq!(cutoff_from_days(30, day(31)), day(1));
    }

    // ── Directory listing ─────────────────────────────────────────────────────

    #[test]
    fn listing_reports_sizes_and_skips_foreign_files() {
        let dir = scenario_dir();
        fs::write(dir.path().join("README.md"), "not a shard").unwrap();

        let shards = list_shards(dir.path()).unwrap();
        assert_eq!(shards.len(), 1);
        assert_eq!(shards[0].session_id, "sess-mix");
        assert_eq!(shards[0].date, day(20));
        assert!(shards[0].size_bytes > 0);
        assert!(shards[0].modified.is_some());
    }
}

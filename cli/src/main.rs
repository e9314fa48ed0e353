//! Chronicle — operator CLI for the audit trail.
//!
//! Thin presentation layer over the Chronicle crates: append one event,
//! search and export history, verify chain integrity, list shards, and
//! archive expired ones.
//!
//! Usage:
//!   chronicle log --session sess-1 --event-type command --actor user --target pane-0
//!   chronicle search --event-type error --since 1h --limit 50
//!   chronicle export --format csv --session sess-1
//!   chronicle verify --session sess-1
//!   chronicle list
//!   chronicle archive --days 30

mod config;

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chronicle_audit::{verify_session, verify_shard, AuditWriter, VerificationReport};
use chronicle_contracts::{
    parse_time_spec, Actor, AuditEvent, ChronicleError, ChronicleResult, EventType, Query,
    SessionId,
};
use chronicle_query::{
    cutoff_from_days, export, list_shards, ExportFormat, RetentionManager, Searcher,
};

use crate::config::ChronicleConfig;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Chronicle — tamper-evident audit trail for multi-agent orchestration.
#[derive(Parser)]
#[command(
    name = "chronicle",
    about = "Append, search, verify, export, and archive audit history"
)]
struct Cli {
    /// Path to a TOML config file (default: ./chronicle.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append one event to a session's chain.
    Log {
        /// Session to append to; omitted = start a fresh session.
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        event_type: String,
        #[arg(long)]
        actor: String,
        #[arg(long)]
        target: String,
        /// Payload fields as key=value (value parsed as JSON, else string).
        #[arg(long = "data")]
        data: Vec<String>,
    },
    /// Search audit history with conjunctive filters.
    Search {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Export matching history as JSON or CSV.
    Export {
        /// Output format: json or csv.
        #[arg(long, default_value = "json")]
        format: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Verify chain integrity for a session or a single shard file.
    Verify {
        /// Verify this session's full chain across all of its shards.
        #[arg(long, conflicts_with = "shard")]
        session: Option<String>,
        /// Verify one shard file in isolation.
        #[arg(long)]
        shard: Option<PathBuf>,
    },
    /// List shard files with size and modification time.
    List,
    /// Move shards older than the retention window to the archive dir.
    Archive {
        /// Override the configured retention window, in days.
        #[arg(long)]
        days: Option<u32>,
    },
}

/// Shared search/export filter flags, mirroring `Query` one-to-one.
#[derive(clap::Args)]
struct FilterArgs {
    /// Restrict to these sessions (repeatable).
    #[arg(long = "session")]
    sessions: Vec<String>,
    /// Restrict to these event types (repeatable).
    #[arg(long = "event-type")]
    event_types: Vec<String>,
    /// Restrict to these actors (repeatable).
    #[arg(long = "actor")]
    actors: Vec<String>,
    /// Wildcard pattern matched against targets (e.g. 'pane-*').
    #[arg(long)]
    target: Option<String>,
    /// Regex matched against a rendered form of each entry.
    #[arg(long)]
    pattern: Option<String>,
    /// RFC3339 instant or relative duration (1h, 7d) — inclusive lower bound.
    #[arg(long)]
    since: Option<String>,
    /// RFC3339 instant or relative duration — exclusive upper bound.
    #[arg(long)]
    until: Option<String>,
    /// Maximum entries returned (0 = unlimited; default from config).
    #[arg(long)]
    limit: Option<usize>,
}

impl FilterArgs {
    /// Build a `Query`, parsing and validating operator input up front.
    fn into_query(self, default_limit: usize) -> ChronicleResult<Query> {
        let now = Utc::now();
        Ok(Query {
            sessions: self.sessions,
            event_types: self
                .event_types
                .iter()
                .map(|s| EventType::from_str(s))
                .collect::<ChronicleResult<_>>()?,
            actors: self
                .actors
                .iter()
                .map(|s| Actor::from_str(s))
                .collect::<ChronicleResult<_>>()?,
            target_glob: self.target,
            pattern: self.pattern,
            since: self.since.as_deref().map(|s| parse_time_spec(s, now)).transpose()?,
            until: self.until.as_deref().map(|s| parse_time_spec(s, now)).transpose()?,
            limit: self.limit.unwrap_or(default_limit),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Structured logging; set RUST_LOG=debug for scan-level detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let config = match ChronicleConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("chronicle: {}", e);
            std::process::exit(1);
        }
    };

    match run(cli.command, &config) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("chronicle: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(command: Command, config: &ChronicleConfig) -> ChronicleResult<()> {
    match command {
        Command::Log {
            session,
            event_type,
            actor,
            target,
            data,
        } => cmd_log(config, session, &event_type, &actor, target, &data),
        Command::Search { filters } => cmd_search(config, filters),
        Command::Export { format, filters } => cmd_export(config, &format, filters),
        Command::Verify { session, shard } => cmd_verify(config, session, shard),
        Command::List => cmd_list(config),
        Command::Archive { days } => cmd_archive(config, days),
    }
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

fn cmd_log(
    config: &ChronicleConfig,
    session: Option<String>,
    event_type: &str,
    actor: &str,
    target: String,
    data: &[String],
) -> ChronicleResult<()> {
    let session = session.unwrap_or_else(|| SessionId::generate().0);
    let mut event = AuditEvent::new(
        EventType::from_str(event_type)?,
        Actor::from_str(actor)?,
        target,
    );
    for pair in data {
        let (key, value) = pair.split_once('=').ok_or_else(|| ChronicleError::InvalidQuery {
            reason: format!("payload field '{}' is not key=value", pair),
        })?;
        // Bare words become strings; valid JSON is taken as-is.
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        event = event.with(key, value);
    }

    let mut writer = AuditWriter::open(&config.audit_dir, session)?;
    let entry = writer.append(event)?;
    println!(
        "appended seq {} to session {} ({})",
        entry.sequence_num, entry.session_id, entry.checksum
    );
    Ok(())
}

fn cmd_search(config: &ChronicleConfig, filters: FilterArgs) -> ChronicleResult<()> {
    let query = filters.into_query(config.default_limit)?;
    let result = Searcher::new(&config.audit_dir).search(&query)?;

    for entry in &result.entries {
        println!("{}", entry.render());
    }
    println!(
        "{} matched ({} shown{}), {} scanned in {}ms",
        result.total_count,
        result.entries.len(),
        if result.truncated { ", truncated" } else { "" },
        result.scanned,
        result.duration_ms,
    );
    Ok(())
}

fn cmd_export(config: &ChronicleConfig, format: &str, filters: FilterArgs) -> ChronicleResult<()> {
    let format = ExportFormat::from_str(format)?;
    let query = filters.into_query(config.default_limit)?;
    let result = Searcher::new(&config.audit_dir).search(&query)?;
    print!("{}", export(&result, format)?);
    Ok(())
}

fn cmd_verify(
    config: &ChronicleConfig,
    session: Option<String>,
    shard: Option<PathBuf>,
) -> ChronicleResult<()> {
    let report = match (&session, &shard) {
        (Some(session), None) => verify_session(&config.audit_dir, session)?,
        (None, Some(path)) => verify_shard(path)?,
        _ => {
            return Err(ChronicleError::InvalidQuery {
                reason: "pass exactly one of --session or --shard".to_string(),
            })
        }
    };
    print_report(&report);
    if !report.valid {
        // Tamper findings are expected output, but operators script on the
        // exit code.
        std::process::exit(2);
    }
    Ok(())
}

fn print_report(report: &VerificationReport) {
    if report.valid {
        println!("OK: {} entries verified", report.entries_checked);
    } else if let Some(failure) = &report.failure {
        println!(
            "TAMPERED: {} at {}:{} — {} ({} entries passed before the failure)",
            failure.kind,
            failure.shard.display(),
            failure.line,
            failure.detail,
            report.entries_checked,
        );
    }
}

fn cmd_list(config: &ChronicleConfig) -> ChronicleResult<()> {
    let shards = list_shards(&config.audit_dir)?;
    if shards.is_empty() {
        println!("no shards under {}", config.audit_dir.display());
        return Ok(());
    }
    for shard in shards {
        let modified = shard
            .modified
            .map(|t| chrono::DateTime::<Utc>::from(t).to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:>10} bytes  modified {}",
            shard.path.display(),
            shard.size_bytes,
            modified,
        );
    }
    Ok(())
}

fn cmd_archive(config: &ChronicleConfig, days: Option<u32>) -> ChronicleResult<()> {
    let days = days.unwrap_or(config.retention_days);
    let cutoff = cutoff_from_days(days, Utc::now().date_naive());

    let manager = RetentionManager::new(&config.audit_dir, &config.archive_dir);
    let outcomes = manager.archive_expired(cutoff)?;

    if outcomes.is_empty() {
        println!("nothing to archive (cutoff {})", cutoff);
        return Ok(());
    }
    for outcome in &outcomes {
        match &outcome.error {
            None => println!("archived {}", outcome.shard),
            Some(e) => println!("FAILED {}: {}", outcome.shard, e),
        }
    }
    let archived = outcomes.iter().filter(|o| o.archived).count();
    println!("{}/{} shards archived to {}", archived, outcomes.len(), config.archive_dir.display());
    Ok(())
}

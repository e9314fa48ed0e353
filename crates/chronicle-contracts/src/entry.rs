//! Audit entry types.
//!
//! `AuditEvent` is what the orchestrator hands to the writer — a bare
//! description of one action.  `AuditEntry` is what lands on disk: the same
//! event stamped with a timestamp, a per-session sequence number, and the
//! hash-chain fields that make after-the-fact modification detectable.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ChronicleError;

/// Stable identifier for one orchestration session.
///
/// The session id is the shard key: all of a session's entries form one
/// logical hash chain, stored across one shard file per calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh, unique session id (`sess-<uuid>`).
    pub fn generate() -> Self {
        Self(format!("sess-{}", uuid::Uuid::new_v4().simple()))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of auditable event kinds.
///
/// Wire form is `snake_case` (e.g. `state_change`).  New kinds are added
/// here, never as free-form strings — the query layer relies on the set
/// being enumerable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A shell or orchestrator command was executed.
    Command,
    /// An agent was spawned into a pane.
    Spawn,
    /// A message was sent to an agent.
    Send,
    /// A response was received from an agent.
    Response,
    /// An error was observed.
    Error,
    /// An orchestration state transition occurred.
    StateChange,
    /// A session began.
    SessionStart,
    /// A session ended.
    SessionEnd,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Command => "command",
            Self::Spawn => "spawn",
            Self::Send => "send",
            Self::Response => "response",
            Self::Error => "error",
            Self::StateChange => "state_change",
            Self::SessionStart => "session_start",
            Self::SessionEnd => "session_end",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for EventType {
    type Err = ChronicleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "command" => Ok(Self::Command),
            "spawn" => Ok(Self::Spawn),
            "send" => Ok(Self::Send),
            "response" => Ok(Self::Response),
            "error" => Ok(Self::Error),
            "state_change" => Ok(Self::StateChange),
            "session_start" => Ok(Self::SessionStart),
            "session_end" => Ok(Self::SessionEnd),
            other => Err(ChronicleError::InvalidQuery {
                reason: format!("unknown event type '{}'", other),
            }),
        }
    }
}

/// Who caused an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    User,
    Agent,
    System,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::System => "system",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Actor {
    type Err = ChronicleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "agent" => Ok(Self::Agent),
            "system" => Ok(Self::System),
            other => Err(ChronicleError::InvalidQuery {
                reason: format!("unknown actor '{}'", other),
            }),
        }
    }
}

/// Event-specific detail attached to an entry.
///
/// A `BTreeMap` rather than `serde_json::Map` so serialization order is a
/// function of the keys alone — two equal payloads always serialize to
/// identical bytes, which the checksum scheme requires.
pub type Payload = BTreeMap<String, serde_json::Value>;

/// One auditable action, before it is chained.
///
/// This is the writer's input: the orchestrator describes what happened and
/// the writer assigns the timestamp, sequence number, and chain fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// What kind of action occurred.
    pub event_type: EventType,
    /// Who caused it.
    pub actor: Actor,
    /// The object acted on (a pane name, bead id, agent name, …).
    pub target: String,
    /// Event-specific detail.  May be empty.
    #[serde(default)]
    pub payload: Payload,
}

impl AuditEvent {
    /// Build an event with an empty payload.
    pub fn new(event_type: EventType, actor: Actor, target: impl Into<String>) -> Self {
        Self {
            event_type,
            actor,
            target: target.into(),
            payload: Payload::new(),
        }
    }

    /// Attach one payload key/value, consuming and returning the event.
    pub fn with(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}

/// One immutable record in a session's hash chain.
///
/// Field order here is the canonical serialization order used for hashing —
/// do not reorder fields without considering existing shards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// UTC instant the event was recorded (RFC3339 on the wire).
    pub timestamp: DateTime<Utc>,
    /// The session this entry belongs to (the shard key).
    pub session_id: String,
    /// What kind of action occurred.
    pub event_type: EventType,
    /// Who caused it.
    pub actor: Actor,
    /// The object acted on.
    pub target: String,
    /// Event-specific detail.
    #[serde(default)]
    pub payload: Payload,
    /// Per-session position, starting at 1, gapless.
    pub sequence_num: u64,
    /// The previous entry's `checksum`; empty string for the first entry.
    pub prev_hash: String,
    /// SHA-256 (hex) of this entry serialized with `checksum` cleared.
    pub checksum: String,
}

impl AuditEntry {
    /// Render the entry as a single searchable line.
    ///
    /// This is the text the query engine's grep pattern is matched against,
    /// so it deliberately includes every field an operator might search on.
    pub fn render(&self) -> String {
        let payload = if self.payload.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&self.payload).unwrap_or_default()
        };
        format!(
            "{} {} {} {} {} {}",
            self.timestamp.to_rfc3339(),
            self.session_id,
            self.event_type,
            self.actor,
            self.target,
            payload,
        )
    }
}

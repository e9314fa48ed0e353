//! # chronicle-contracts
//!
//! Shared types, shard-naming conventions, and error types for the
//! Chronicle audit trail.
//!
//! All crates in the workspace import from here.  No business logic lives
//! in this crate — only data definitions, filename conventions, and errors.

pub mod entry;
pub mod error;
pub mod query;
pub mod shard;

pub use entry::{Actor, AuditEntry, AuditEvent, EventType, Payload, SessionId};
pub use error::{ChronicleError, ChronicleResult};
pub use query::{parse_time_spec, Query, QueryResult};
pub use shard::{parse_shard_name, shard_file_name, ShardInfo, SHARD_EXT};

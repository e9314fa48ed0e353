//! TOML configuration for the Chronicle CLI.
//!
//! Every field has a default, so a missing config file means "use
//! defaults" — only an explicitly named file that cannot be read or parsed
//! is an error.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use chronicle_contracts::{ChronicleError, ChronicleResult};

/// Filename probed in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "chronicle.toml";

/// CLI configuration, deserialized from TOML.
///
/// ```toml
/// audit_dir = "/var/lib/chronicle/audit"
/// archive_dir = "/var/lib/chronicle/archive"
/// retention_days = 30
/// default_limit = 100
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChronicleConfig {
    /// Directory holding live shard files.
    pub audit_dir: PathBuf,
    /// Cold-storage root the retention manager moves expired shards into.
    pub archive_dir: PathBuf,
    /// Shards dated more than this many days ago are archive candidates.
    pub retention_days: u32,
    /// Result limit applied when a search does not specify one.
    pub default_limit: usize,
}

impl Default for ChronicleConfig {
    fn default() -> Self {
        Self {
            audit_dir: PathBuf::from(".chronicle/audit"),
            archive_dir: PathBuf::from(".chronicle/archive"),
            retention_days: 30,
            default_limit: 100,
        }
    }
}

impl ChronicleConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> ChronicleResult<Self> {
        toml::from_str(s).map_err(|e| ChronicleError::Config {
            reason: format!("failed to parse config TOML: {}", e),
        })
    }

    /// Load configuration.
    ///
    /// With `Some(path)`, the file must exist and parse.  With `None`, the
    /// default config file is used if present in the working directory,
    /// otherwise built-in defaults apply.
    pub fn load(path: Option<&Path>) -> ChronicleResult<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml_str(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                Ok(Self::default())
            }
            Err(e) => Err(ChronicleError::Config {
                reason: format!("failed to read config file '{}': {}", path.display(), e),
            }),
        }
    }
}

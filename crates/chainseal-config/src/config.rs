//! Configuration schema for a chainseal deployment.
//!
//! A `LedgerConfig` is deserialized from TOML. Every field has a default, so
//! an empty document is a valid configuration that signs with the key from
//! `CHAINSEAL_SIGNING_KEY` and keeps entries in memory.
//!
//! Example:
//! ```toml
//! signing_key_env = "AUDIT_SIGNING_KEY"
//! log_level = "info"
//!
//! [storage]
//! path = "/var/lib/chainseal/audit.jsonl"
//!
//! [schema]
//! path = "/etc/chainseal/entry.schema.json"
//!
//! [[retired_keys]]
//! from_entry_id = "5a0c3e0e-8d7a-4f7e-9a59-7f3f8c1b2d44"
//! key = "previous-signing-key-at-least-32-chars"
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use chainseal_contracts::key::{KeyRotationRecord, SigningKey};

/// Environment variable consulted when no literal `signing_key` is set.
pub const DEFAULT_SIGNING_KEY_ENV: &str = "CHAINSEAL_SIGNING_KEY";

fn default_signing_key_env() -> String {
    DEFAULT_SIGNING_KEY_ENV.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Where sealed entries are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// JSON Lines file. When absent, entries live in memory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Which schema entry payloads are validated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    /// JSON Schema file. When absent, the built-in entry schema is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// The top-level structure deserialized from a chainseal TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Literal signing key. Takes precedence over `signing_key_env`.
    ///
    /// Checked for minimum length while parsing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<SigningKey>,

    /// Environment variable holding the signing key.
    #[serde(default = "default_signing_key_env")]
    pub signing_key_env: String,

    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub schema: SchemaConfig,

    /// Keys retired by earlier rotations, oldest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub retired_keys: Vec<KeyRotationRecord>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            signing_key: None,
            signing_key_env: default_signing_key_env(),
            log_level: default_log_level(),
            storage: StorageConfig::default(),
            schema: SchemaConfig::default(),
            retired_keys: Vec::new(),
        }
    }
}

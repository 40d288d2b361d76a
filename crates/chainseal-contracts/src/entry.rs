//! Audit entry types.
//!
//! `NewEntry` is what callers hand to the chain; `AuditEntry` is the sealed,
//! immutable record that storage persists. Field names serialize in
//! camelCase so every backend shares one persisted layout.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `previous_entry_hash` of the first entry in every chain.
///
/// 64 hex zeros.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Current version of the integrity block layout.
pub const INTEGRITY_VERSION: u32 = 1;

/// Event name recorded at every signing key rotation.
pub const KEY_ROTATION_EVENT: &str = "signing_key_rotated";

/// Caller-supplied fields for a new audit entry.
///
/// Everything the chain assigns itself (`id`, `timestamp`, `integrity`) is
/// absent here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    /// Event classification, e.g. `"login"` or `"permission_changed"`.
    pub event: String,
    /// Severity, e.g. `"info"`. The accepted set is owned by the schema validator.
    pub level: String,
    /// Human-readable description.
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Arbitrary structured context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl NewEntry {
    /// Build an entry with the three required fields.
    pub fn new(
        event: impl Into<String>,
        level: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event: event.into(),
            level: level.into(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// The chain-linking block attached to every sealed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityBlock {
    /// Layout version, currently `INTEGRITY_VERSION`.
    pub version: u32,
    /// Hex HMAC-SHA256 over `"<entry hash>:<previous_entry_hash>"`.
    pub signature: String,
    /// Content hash of the preceding entry, or `GENESIS_HASH`.
    pub previous_entry_hash: String,
}

/// A sealed entry in the audit chain.
///
/// Modifying any content field invalidates `integrity.signature`, and
/// modifying the entry's content hash breaks the next entry's
/// `previous_entry_hash`. Either is caught by chain verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// UUID v4, assigned when the entry is sealed.
    pub id: String,
    pub event: String,
    pub level: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub integrity: IntegrityBlock,
}

impl AuditEntry {
    /// The creation time as a UTC datetime, if `timestamp` is in range.
    pub fn recorded_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }
}

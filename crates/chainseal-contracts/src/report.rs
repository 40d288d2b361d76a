//! Verification, statistics, and snapshot reports produced by the chain.

use serde::{Deserialize, Serialize};

/// Error text reported when an entry's link to its predecessor is wrong.
pub const LINK_BROKEN: &str = "Chain link broken: previous hash mismatch";

/// Error text reported when an entry's signature does not recompute.
pub const SIGNATURE_FAILED: &str = "Signature verification failed";

/// Outcome of a full chain verification pass.
///
/// `entries_checked` includes the entry at which a break was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub valid: bool,
    pub entries_checked: u64,
    /// Id of the first entry that failed verification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broken_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VerificationResult {
    pub fn valid(entries_checked: u64) -> Self {
        Self {
            valid: true,
            entries_checked,
            broken_at: None,
            error: None,
        }
    }

    pub fn broken(entries_checked: u64, broken_at: impl Into<String>, error: &str) -> Self {
        Self {
            valid: false,
            entries_checked,
            broken_at: Some(broken_at.into()),
            error: Some(error.to_string()),
        }
    }
}

/// Chain health summary. Producing one walks the whole chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStats {
    pub entries_count: u64,
    pub chain_valid: bool,
    /// Completion time of the verification pass, ms since the Unix epoch.
    pub last_verification: i64,
    /// The full result of that pass.
    pub verification: VerificationResult,
}

/// Point-in-time chain head metadata, captured without walking the chain.
///
/// Intended to be taken right before any remediation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSnapshot {
    /// Capture time, ms since the Unix epoch.
    pub timestamp: i64,
    pub entries_count: u64,
    pub last_hash: String,
    pub last_entry_id: Option<String>,
}

/// Lifecycle state of an `AuditChain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ChainStatus {
    /// Constructed, head not yet loaded from storage.
    Uninitialized,
    /// Head loaded and verified; writes accepted.
    Ready,
    /// The stored tail failed verification; writes are refused.
    Compromised { reason: String },
}

impl ChainStatus {
    pub fn accepts_writes(&self) -> bool {
        !matches!(self, Self::Compromised { .. })
    }
}

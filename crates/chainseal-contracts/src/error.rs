//! Error types for the chainseal audit chain.
//!
//! All fallible chain operations return `LedgerResult<T>`. Structural damage
//! found while verifying is not an error: it is reported through
//! `VerificationResult`.

use thiserror::Error;

/// The unified error type for chainseal.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A signing key or configuration value is missing or invalid.
    ///
    /// Fatal: retrying with the same input will fail the same way.
    #[error("configuration error: {reason}")]
    Configuration { reason: String },

    /// The persisted tail of the chain does not verify under the configured key.
    ///
    /// Once raised the chain refuses every further write.
    #[error("audit chain integrity compromised: {reason}")]
    IntegrityCompromised { reason: String },

    /// The proposed entry fields were rejected before hashing.
    ///
    /// No chain state was modified.
    #[error("schema validation error: {reason}")]
    SchemaValidation { reason: String },

    /// The storage backend failed to read or persist entries.
    ///
    /// A failed append leaves the chain head unchanged, so the write is safe
    /// to retry.
    #[error("storage error: {reason}")]
    Storage { reason: String },
}

impl LedgerError {
    /// Shorthand for wrapping an I/O or codec failure as a storage error.
    pub fn storage(reason: impl std::fmt::Display) -> Self {
        Self::Storage {
            reason: reason.to_string(),
        }
    }
}

/// Convenience alias used throughout the chainseal crates.
pub type LedgerResult<T> = Result<T, LedgerError>;

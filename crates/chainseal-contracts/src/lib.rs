//! # chainseal-contracts
//!
//! Shared types and errors for the chainseal audit chain.
//!
//! All crates in the workspace import from here. No chain logic lives in
//! this crate, only data definitions and error types.

pub mod entry;
pub mod error;
pub mod key;
pub mod report;

pub use entry::{AuditEntry, IntegrityBlock, NewEntry, GENESIS_HASH, INTEGRITY_VERSION};
pub use error::{LedgerError, LedgerResult};
pub use key::{KeyRotationRecord, SigningKey, MIN_KEY_LENGTH};
pub use report::{ChainSnapshot, ChainStats, ChainStatus, VerificationResult};

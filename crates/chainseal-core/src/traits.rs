//! Trait definitions for the collaborators the chain depends on.
//!
//! - `AuditStorage`: durable, append-only, order-preserving entry store
//! - `SchemaValidator`: gate that rejects malformed payloads before hashing
//!
//! `AuditChain` is written only against these traits. The in-memory store
//! used by tests and the file-backed store are ordinary implementations and
//! are never special-cased.

use async_trait::async_trait;
use futures::stream::BoxStream;

use chainseal_contracts::{
    entry::{AuditEntry, NewEntry},
    error::LedgerResult,
};

/// A finite, oldest-first traversal of stored entries.
pub type EntryStream<'a> = BoxStream<'a, LedgerResult<AuditEntry>>;

/// The persistence backend for sealed entries.
///
/// Implementations must preserve insertion order and must never reorder,
/// mutate, or remove an entry once `append` has returned `Ok`. Every call
/// is expected to carry its own timeout; the chain applies none.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Durably persist one sealed entry at the end of the sequence.
    async fn append(&self, entry: &AuditEntry) -> LedgerResult<()>;

    /// The most recently appended entry, or `None` when empty.
    async fn get_last(&self) -> LedgerResult<Option<AuditEntry>>;

    /// Traverse every entry in chain order.
    ///
    /// Each call yields an independent traversal starting from the first
    /// entry.
    fn iterate(&self) -> EntryStream<'_>;

    /// Number of stored entries.
    async fn count(&self) -> LedgerResult<u64>;

    /// Look an entry up by its id.
    async fn get_by_id(&self, id: &str) -> LedgerResult<Option<AuditEntry>>;
}

/// Validates proposed entry fields before they are sealed.
///
/// Implementations are pure: the same fields always produce the same
/// verdict. A rejection is reported as `LedgerError::SchemaValidation`.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, fields: &NewEntry) -> LedgerResult<()>;
}

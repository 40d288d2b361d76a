//! In-memory implementation of `AuditStorage`.
//!
//! `MemoryStorage` keeps entries in an append-ordered `Vec` (the arena) plus
//! an id → position `HashMap` (the index), both behind one `Mutex`. It is the
//! backend for tests, demos, and short-lived processes; nothing is persisted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tracing::{debug, warn};

use chainseal_contracts::{
    entry::AuditEntry,
    error::{LedgerError, LedgerResult},
};
use chainseal_core::traits::{AuditStorage, EntryStream};

// ── Internal mutable state ────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryState {
    /// All entries, in append order.
    entries: Vec<AuditEntry>,
    /// Entry id → position in `entries`.
    index: HashMap<String, usize>,
}

// ── Public storage ────────────────────────────────────────────────────────────

/// An append-only, in-process entry store.
///
/// # Thread safety
///
/// Every operation takes the internal `Mutex` for the duration of a copy or
/// push, never across an await point.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite a stored entry in place.
    ///
    /// This deliberately breaks the append-only contract. It exists to
    /// rehearse tamper detection; returns `false` if `id` is unknown.
    pub fn tamper_with(&self, id: &str, f: impl FnOnce(&mut AuditEntry)) -> LedgerResult<bool> {
        let mut state = self.lock()?;
        let Some(&position) = state.index.get(id) else {
            return Ok(false);
        };
        warn!(entry_id = %id, "stored audit entry rewritten in place");
        f(&mut state.entries[position]);
        Ok(true)
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| LedgerError::storage(format!("memory storage lock poisoned: {e}")))
    }

    fn snapshot(&self) -> LedgerResult<Vec<AuditEntry>> {
        Ok(self.lock()?.entries.clone())
    }
}

// ── AuditStorage impl ─────────────────────────────────────────────────────────

#[async_trait]
impl AuditStorage for MemoryStorage {
    /// Push `entry` onto the arena and index its id.
    ///
    /// Rejects an id that is already stored: ids are never reused.
    async fn append(&self, entry: &AuditEntry) -> LedgerResult<()> {
        let mut state = self.lock()?;
        if state.index.contains_key(&entry.id) {
            return Err(LedgerError::Storage {
                reason: format!("entry id '{}' already stored", entry.id),
            });
        }

        let position = state.entries.len();
        state.index.insert(entry.id.clone(), position);
        state.entries.push(entry.clone());

        debug!(entry_id = %entry.id, position, "entry appended to memory storage");
        Ok(())
    }

    async fn get_last(&self) -> LedgerResult<Option<AuditEntry>> {
        Ok(self.lock()?.entries.last().cloned())
    }

    /// Traverse a copy of the entries taken when the stream is created.
    fn iterate(&self) -> EntryStream<'_> {
        match self.snapshot() {
            Ok(entries) => stream::iter(entries.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }

    async fn count(&self) -> LedgerResult<u64> {
        Ok(self.lock()?.entries.len() as u64)
    }

    async fn get_by_id(&self, id: &str) -> LedgerResult<Option<AuditEntry>> {
        let state = self.lock()?;
        Ok(state
            .index
            .get(id)
            .map(|&position| state.entries[position].clone()))
    }
}

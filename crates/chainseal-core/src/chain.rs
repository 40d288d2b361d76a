//! The audit chain: the single writer for one tamper-evident log.
//!
//! Every write follows the same pipeline:
//!
//!   Initialize → Validate → Seal (hash + sign) → Append → Advance head
//!
//! The head is advanced only after storage accepts the entry, so a failed
//! append leaves the chain exactly as it was and the call can be retried.
//!
//! All chain state (last hash, active key, key schedule, lifecycle status)
//! lives in one `ChainState` behind an async mutex. Writers hold that lock
//! across the storage round-trip, which is what guarantees that no two
//! entries ever claim the same predecessor.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use chainseal_contracts::{
    entry::{AuditEntry, IntegrityBlock, NewEntry, GENESIS_HASH, INTEGRITY_VERSION, KEY_ROTATION_EVENT},
    error::{LedgerError, LedgerResult},
    key::{KeyRotationRecord, SigningKey},
    report::{
        ChainSnapshot, ChainStats, ChainStatus, VerificationResult, LINK_BROKEN, SIGNATURE_FAILED,
    },
};

use crate::{
    hasher::compute_entry_hash,
    schedule::KeySchedule,
    signer::{sign, verify_signature},
    traits::{AuditStorage, SchemaValidator},
};

/// The running head of the chain.
///
/// `last_hash` and `active_key` only ever change together, under the lock.
#[derive(Debug, Clone)]
struct ChainHead {
    last_hash: String,
    last_entry_id: Option<String>,
    active_key: SigningKey,
}

#[derive(Debug)]
struct ChainState {
    status: ChainStatus,
    head: ChainHead,
    schedule: KeySchedule,
}

/// A tamper-evident, append-only audit chain over an `AuditStorage`.
///
/// Construct one per log. The lifecycle is explicit:
/// `new` → `initialize` (or the first `record`) → use → drop.
///
/// ```rust,ignore
/// let chain = AuditChain::new(key, storage, Box::new(JsonSchemaValidator::new()?))?;
/// chain.initialize().await?;
/// chain.record(NewEntry::new("login", "info", "user logged in")).await?;
/// assert!(chain.verify().await?.valid);
/// ```
pub struct AuditChain {
    storage: Arc<dyn AuditStorage>,
    validator: Box<dyn SchemaValidator>,
    state: Mutex<ChainState>,
}

impl AuditChain {
    /// Create an uninitialized chain that signs with `signing_key`.
    ///
    /// Returns `LedgerError::Configuration` when the key is shorter than
    /// `MIN_KEY_LENGTH` characters.
    pub fn new(
        signing_key: impl Into<String>,
        storage: Arc<dyn AuditStorage>,
        validator: Box<dyn SchemaValidator>,
    ) -> LedgerResult<Self> {
        let active_key = SigningKey::new(signing_key)?;
        Ok(Self {
            storage,
            validator,
            state: Mutex::new(ChainState {
                status: ChainStatus::Uninitialized,
                head: ChainHead {
                    last_hash: GENESIS_HASH.to_string(),
                    last_entry_id: None,
                    active_key,
                },
                schedule: KeySchedule::default(),
            }),
        })
    }

    /// Seed the key schedule with rotations recorded by an earlier process.
    ///
    /// Needed to verify a chain that was rotated before this process started.
    pub fn with_key_schedule(mut self, rotations: Vec<KeyRotationRecord>) -> Self {
        self.state.get_mut().schedule = KeySchedule::new(rotations);
        self
    }

    /// Load the chain head from storage and check the stored tail.
    ///
    /// A no-op once the chain is ready. The tail entry's signature is
    /// recomputed with the configured key (or, when the tail is the latest
    /// rotation boundary, the key it retired). A mismatch marks the chain
    /// compromised and returns `LedgerError::IntegrityCompromised`; every
    /// later write is refused with the same error.
    pub async fn initialize(&self) -> LedgerResult<()> {
        let mut state = self.state.lock().await;
        self.initialize_locked(&mut state).await
    }

    /// Validate, seal, and append a new entry.
    ///
    /// Initializes the chain first if needed.
    ///
    /// # Errors
    ///
    /// - `SchemaValidation` when the validator rejects `fields`
    /// - `IntegrityCompromised` when the chain refuses writes
    /// - `Storage` when the append fails
    ///
    /// In every error case the chain head is unchanged.
    pub async fn record(&self, fields: NewEntry) -> LedgerResult<AuditEntry> {
        let mut state = self.state.lock().await;
        self.record_locked(&mut state, fields).await
    }

    /// Re-derive the whole chain from storage.
    ///
    /// Independent of the in-memory head, so entries written by other
    /// processes are checked too. Damage is reported in the returned
    /// `VerificationResult`; only storage failures are errors.
    ///
    /// Runs without holding the write lock. An append racing this pass may
    /// be reported as broken at the very last entry.
    pub async fn verify(&self) -> LedgerResult<VerificationResult> {
        let (schedule, active_key) = {
            let state = self.state.lock().await;
            (state.schedule.clone(), state.head.active_key.clone())
        };

        let mut cursor = schedule.cursor(&active_key);
        let mut expected_previous = GENESIS_HASH.to_string();
        let mut entries_checked: u64 = 0;
        let mut entries = self.storage.iterate();

        while let Some(entry) = entries.next().await {
            let entry = entry?;
            entries_checked += 1;

            if entry.integrity.previous_entry_hash != expected_previous {
                warn!(
                    entry_id = %entry.id,
                    position = entries_checked,
                    "chain link broken: previous hash mismatch"
                );
                return Ok(VerificationResult::broken(entries_checked, entry.id, LINK_BROKEN));
            }

            let hash = compute_entry_hash(&entry);
            let expected_signature = sign(&hash, &entry.integrity.previous_entry_hash, cursor.current());
            if !verify_signature(&entry.integrity.signature, &expected_signature) {
                let rotation_boundary = cursor.boundary() == Some(entry.id.as_str());
                warn!(
                    entry_id = %entry.id,
                    position = entries_checked,
                    rotation_boundary,
                    "signature verification failed"
                );
                return Ok(VerificationResult::broken(
                    entries_checked,
                    entry.id,
                    SIGNATURE_FAILED,
                ));
            }

            debug!(entry_id = %entry.id, position = entries_checked, "entry verified");
            cursor.advance_past(&entry.id);
            expected_previous = hash;
        }

        for rotation in cursor.unreached() {
            warn!(
                boundary_entry_id = %rotation.from_entry_id,
                "key schedule boundary not found in storage"
            );
        }

        debug!(entries_checked, "chain verified");
        Ok(VerificationResult::valid(entries_checked))
    }

    /// Count entries and verify the full chain. O(n) in chain length.
    pub async fn get_stats(&self) -> LedgerResult<ChainStats> {
        let entries_count = self.storage.count().await?;
        let verification = self.verify().await?;
        Ok(ChainStats {
            entries_count,
            chain_valid: verification.valid,
            last_verification: Utc::now().timestamp_millis(),
            verification,
        })
    }

    /// Capture head metadata without walking the chain.
    ///
    /// Works on a compromised or uninitialized chain too: in that case the
    /// head is derived from the stored tail without checking its signature,
    /// which is exactly the state an operator needs before remediation.
    pub async fn create_snapshot(&self) -> LedgerResult<ChainSnapshot> {
        let state = self.state.lock().await;
        let entries_count = self.storage.count().await?;

        let (last_hash, last_entry_id) = if state.status == ChainStatus::Ready {
            (state.head.last_hash.clone(), state.head.last_entry_id.clone())
        } else {
            match self.storage.get_last().await? {
                Some(tail) => (compute_entry_hash(&tail), Some(tail.id)),
                None => (GENESIS_HASH.to_string(), None),
            }
        };

        info!(entries_count, last_hash = %last_hash, "chain snapshot captured");
        Ok(ChainSnapshot {
            timestamp: Utc::now().timestamp_millis(),
            entries_count,
            last_hash,
            last_entry_id,
        })
    }

    /// Rotate the signing key.
    ///
    /// Records a `signing_key_rotated` entry signed with the outgoing key,
    /// then retires that key into the schedule and activates `new_key`. The
    /// key is swapped only if the rotation entry was persisted. Returns the
    /// rotation entry.
    ///
    /// Returns `LedgerError::Configuration` for a short key, before any
    /// entry is written.
    pub async fn update_signing_key(&self, new_key: impl Into<String>) -> LedgerResult<AuditEntry> {
        let new_key = SigningKey::new(new_key)?;

        let mut state = self.state.lock().await;
        let rotation_number = state.schedule.rotations().len() + 1;
        let fields = NewEntry::new(KEY_ROTATION_EVENT, "info", "signing key rotated")
            .with_metadata(json!({ "rotation": rotation_number }));
        let rotation_entry = self.record_locked(&mut state, fields).await?;

        let retired = state.head.active_key.clone();
        state.schedule.push(rotation_entry.id.clone(), retired);
        state.head.active_key = new_key;

        info!(
            boundary_entry_id = %rotation_entry.id,
            rotation = rotation_number,
            "signing key rotated"
        );
        Ok(rotation_entry)
    }

    /// Current lifecycle state.
    pub async fn status(&self) -> ChainStatus {
        self.state.lock().await.status.clone()
    }

    /// Every rotation so far, oldest first.
    ///
    /// Persist this after a rotation so a restarted process can still
    /// verify the segments signed with retired keys.
    pub async fn key_schedule(&self) -> Vec<KeyRotationRecord> {
        self.state.lock().await.schedule.rotations().to_vec()
    }

    /// Look up a stored entry by id.
    pub async fn get_entry(&self, id: &str) -> LedgerResult<Option<AuditEntry>> {
        self.storage.get_by_id(id).await
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    async fn initialize_locked(&self, state: &mut ChainState) -> LedgerResult<()> {
        match &state.status {
            ChainStatus::Ready => return Ok(()),
            ChainStatus::Compromised { reason } => {
                return Err(LedgerError::IntegrityCompromised {
                    reason: reason.clone(),
                })
            }
            ChainStatus::Uninitialized => {}
        }

        let Some(tail) = self.storage.get_last().await? else {
            state.head.last_hash = GENESIS_HASH.to_string();
            state.head.last_entry_id = None;
            state.status = ChainStatus::Ready;
            info!("audit chain initialized empty at genesis");
            return Ok(());
        };

        // The latest rotation entry is signed with the key it retired.
        let key = match state.schedule.last() {
            Some(rotation) if rotation.from_entry_id == tail.id => &rotation.key,
            _ => &state.head.active_key,
        };

        let hash = compute_entry_hash(&tail);
        let expected = sign(&hash, &tail.integrity.previous_entry_hash, key);
        if !verify_signature(&tail.integrity.signature, &expected) {
            let reason = format!(
                "signature of last stored entry '{}' does not match the configured signing key",
                tail.id
            );
            error!(entry_id = %tail.id, "audit chain integrity compromised; refusing further writes");
            state.status = ChainStatus::Compromised {
                reason: reason.clone(),
            };
            return Err(LedgerError::IntegrityCompromised { reason });
        }

        info!(last_entry_id = %tail.id, last_hash = %hash, "audit chain initialized from storage");
        state.head.last_hash = hash;
        state.head.last_entry_id = Some(tail.id);
        state.status = ChainStatus::Ready;
        Ok(())
    }

    async fn record_locked(&self, state: &mut ChainState, fields: NewEntry) -> LedgerResult<AuditEntry> {
        self.initialize_locked(state).await?;

        if let Err(e) = self.validator.validate(&fields) {
            warn!(event = %fields.event, error = %e, "audit entry rejected by schema validator");
            return Err(e);
        }

        let previous_hash = state.head.last_hash.clone();
        let mut entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            event: fields.event,
            level: fields.level,
            message: fields.message,
            user_id: fields.user_id,
            task_id: fields.task_id,
            correlation_id: fields.correlation_id,
            metadata: fields.metadata,
            timestamp: Utc::now().timestamp_millis(),
            integrity: IntegrityBlock {
                version: INTEGRITY_VERSION,
                signature: String::new(),
                previous_entry_hash: previous_hash,
            },
        };

        let hash = compute_entry_hash(&entry);
        entry.integrity.signature = sign(&hash, &entry.integrity.previous_entry_hash, &state.head.active_key);

        if let Err(e) = self.storage.append(&entry).await {
            warn!(entry_id = %entry.id, error = %e, "append failed; chain head unchanged");
            return Err(e);
        }

        debug!(entry_id = %entry.id, event = %entry.event, hash = %hash, "audit entry recorded");
        state.head.last_hash = hash;
        state.head.last_entry_id = Some(entry.id.clone());
        Ok(entry)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;
    use futures::stream;

    use chainseal_contracts::{
        entry::{AuditEntry, NewEntry, GENESIS_HASH, KEY_ROTATION_EVENT},
        error::{LedgerError, LedgerResult},
        report::{ChainStatus, LINK_BROKEN, SIGNATURE_FAILED},
    };

    use crate::{
        hasher::compute_entry_hash,
        signer::{sign, verify_signature},
        traits::{AuditStorage, EntryStream, SchemaValidator},
    };

    use super::*;

    const KEY_1: &str = "k1-0123456789abcdef0123456789abcdef";
    const KEY_2: &str = "k2-fedcba9876543210fedcba9876543210";

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// A vector-backed store that can be told to fail appends and lets tests
    /// rewrite history directly.
    #[derive(Default)]
    struct MockStorage {
        entries: StdMutex<Vec<AuditEntry>>,
        fail_appends: AtomicBool,
    }

    impl MockStorage {
        fn tamper(&self, index: usize, f: impl FnOnce(&mut AuditEntry)) {
            f(&mut self.entries.lock().unwrap()[index]);
        }

        fn snapshot(&self) -> Vec<AuditEntry> {
            self.entries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuditStorage for MockStorage {
        async fn append(&self, entry: &AuditEntry) -> LedgerResult<()> {
            // Give concurrent writers a chance to interleave.
            tokio::task::yield_now().await;
            if self.fail_appends.load(Ordering::SeqCst) {
                return Err(LedgerError::storage("disk unavailable"));
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn get_last(&self) -> LedgerResult<Option<AuditEntry>> {
            Ok(self.entries.lock().unwrap().last().cloned())
        }

        fn iterate(&self) -> EntryStream<'_> {
            stream::iter(self.snapshot().into_iter().map(Ok)).boxed()
        }

        async fn count(&self) -> LedgerResult<u64> {
            Ok(self.entries.lock().unwrap().len() as u64)
        }

        async fn get_by_id(&self, id: &str) -> LedgerResult<Option<AuditEntry>> {
            Ok(self.entries.lock().unwrap().iter().find(|e| e.id == id).cloned())
        }
    }

    struct AcceptAll;

    impl SchemaValidator for AcceptAll {
        fn validate(&self, _fields: &NewEntry) -> LedgerResult<()> {
            Ok(())
        }
    }

    /// Rejects any entry whose level is not `info`.
    struct InfoOnly;

    impl SchemaValidator for InfoOnly {
        fn validate(&self, fields: &NewEntry) -> LedgerResult<()> {
            if fields.level == "info" {
                Ok(())
            } else {
                Err(LedgerError::SchemaValidation {
                    reason: format!("level '{}' is not allowed", fields.level),
                })
            }
        }
    }

    fn make_chain(key: &str, storage: &Arc<MockStorage>) -> AuditChain {
        AuditChain::new(key, storage.clone(), Box::new(AcceptAll)).unwrap()
    }

    fn login() -> NewEntry {
        NewEntry::new("login", "info", "user logged in").with_user_id("u-1")
    }

    fn logout() -> NewEntry {
        NewEntry::new("logout", "info", "user logged out").with_user_id("u-1")
    }

    async fn record_n(chain: &AuditChain, n: usize) -> Vec<AuditEntry> {
        let mut out = Vec::new();
        for i in 0..n {
            let fields = NewEntry::new("permission_changed", "info", format!("change #{i}"))
                .with_metadata(json!({ "index": i }));
            out.push(chain.record(fields).await.unwrap());
        }
        out
    }

    // ── Construction ─────────────────────────────────────────────────────────

    #[test]
    fn key_of_31_characters_is_rejected() {
        let storage = Arc::new(MockStorage::default());
        let result = AuditChain::new("a".repeat(31), storage, Box::new(AcceptAll));
        assert!(matches!(result, Err(LedgerError::Configuration { .. })));
    }

    #[test]
    fn key_of_32_characters_is_accepted() {
        let storage = Arc::new(MockStorage::default());
        assert!(AuditChain::new("a".repeat(32), storage, Box::new(AcceptAll)).is_ok());
    }

    // ── Recording ────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn first_entry_links_to_genesis() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);

        let first = chain.record(login()).await.unwrap();
        assert_eq!(first.integrity.previous_entry_hash, GENESIS_HASH);
        assert_eq!(first.integrity.version, INTEGRITY_VERSION);
        assert_eq!(chain.status().await, ChainStatus::Ready);
    }

    #[tokio::test]
    async fn entries_link_and_sign_with_active_key() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);

        let e1 = chain.record(login()).await.unwrap();
        let e2 = chain.record(logout()).await.unwrap();

        let h1 = compute_entry_hash(&e1);
        let h2 = compute_entry_hash(&e2);
        assert_eq!(e2.integrity.previous_entry_hash, h1);

        let key = SigningKey::new(KEY_1).unwrap();
        assert!(verify_signature(&e2.integrity.signature, &sign(&h2, &h1, &key)));
        assert_eq!(storage.snapshot(), vec![e1, e2]);
    }

    #[tokio::test]
    async fn schema_rejection_leaves_chain_untouched() {
        let storage = Arc::new(MockStorage::default());
        let chain = AuditChain::new(KEY_1, storage.clone(), Box::new(InfoOnly)).unwrap();
        chain.record(login()).await.unwrap();
        let before = chain.create_snapshot().await.unwrap();

        let err = chain
            .record(NewEntry::new("login", "shout", "bad level"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::SchemaValidation { .. }));

        let after = chain.create_snapshot().await.unwrap();
        assert_eq!(after.entries_count, 1);
        assert_eq!(after.last_hash, before.last_hash);
        assert_eq!(after.last_entry_id, before.last_entry_id);
    }

    #[tokio::test]
    async fn failed_append_is_retryable_with_same_predecessor() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        let first = chain.record(login()).await.unwrap();

        storage.fail_appends.store(true, Ordering::SeqCst);
        let err = chain.record(logout()).await.unwrap_err();
        assert!(matches!(err, LedgerError::Storage { .. }));
        assert_eq!(storage.snapshot().len(), 1);

        storage.fail_appends.store(false, Ordering::SeqCst);
        let retried = chain.record(logout()).await.unwrap();
        assert_eq!(retried.integrity.previous_entry_hash, compute_entry_hash(&first));

        let result = chain.verify().await.unwrap();
        assert_eq!(result, VerificationResult::valid(2));
    }

    #[tokio::test]
    async fn concurrent_records_never_fork_the_chain() {
        let storage = Arc::new(MockStorage::default());
        let chain = Arc::new(make_chain(KEY_1, &storage));

        let writes = (0..20).map(|i| {
            let chain = Arc::clone(&chain);
            async move {
                chain
                    .record(NewEntry::new("task_run", "info", format!("run {i}")))
                    .await
            }
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }

        let entries = storage.snapshot();
        let mut predecessors: Vec<&str> = entries
            .iter()
            .map(|e| e.integrity.previous_entry_hash.as_str())
            .collect();
        predecessors.sort_unstable();
        predecessors.dedup();
        assert_eq!(predecessors.len(), 20, "every entry must have a distinct predecessor");
        assert_eq!(chain.verify().await.unwrap(), VerificationResult::valid(20));
    }

    // ── Verification ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn empty_chain_is_valid() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        assert_eq!(chain.verify().await.unwrap(), VerificationResult::valid(0));
    }

    #[tokio::test]
    async fn clean_chain_verifies_every_entry() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        record_n(&chain, 7).await;

        assert_eq!(chain.verify().await.unwrap(), VerificationResult::valid(7));
    }

    #[tokio::test]
    async fn tampered_message_is_localized() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        let e1 = chain.record(login()).await.unwrap();
        chain.record(logout()).await.unwrap();
        assert_eq!(chain.verify().await.unwrap(), VerificationResult::valid(2));

        storage.tamper(0, |e| e.message = "TAMPERED".to_string());

        let result = chain.verify().await.unwrap();
        assert!(!result.valid);
        assert_eq!(result.entries_checked, 1);
        assert_eq!(result.broken_at.as_deref(), Some(e1.id.as_str()));
        assert_eq!(result.error.as_deref(), Some(SIGNATURE_FAILED));
    }

    #[tokio::test]
    async fn tampering_any_position_breaks_at_that_entry() {
        for k in 0..3 {
            let storage = Arc::new(MockStorage::default());
            let chain = make_chain(KEY_1, &storage);
            let entries = record_n(&chain, 3).await;

            storage.tamper(k, |e| e.metadata = Some(json!({ "index": 99 })));

            let result = chain.verify().await.unwrap();
            assert!(!result.valid);
            assert_eq!(result.broken_at.as_deref(), Some(entries[k].id.as_str()));
            assert_eq!(result.entries_checked, k as u64 + 1);
        }
    }

    #[tokio::test]
    async fn rewritten_link_is_reported_as_link_break() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        let entries = record_n(&chain, 3).await;

        storage.tamper(2, |e| e.integrity.previous_entry_hash = GENESIS_HASH.to_string());

        let result = chain.verify().await.unwrap();
        assert_eq!(
            result,
            VerificationResult::broken(3, entries[2].id.clone(), LINK_BROKEN)
        );
    }

    #[tokio::test]
    async fn deleted_entry_breaks_the_following_link() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        let entries = record_n(&chain, 3).await;

        storage.entries.lock().unwrap().remove(1);

        let result = chain.verify().await.unwrap();
        assert_eq!(result.broken_at.as_deref(), Some(entries[2].id.as_str()));
        assert_eq!(result.error.as_deref(), Some(LINK_BROKEN));
    }

    // ── Key rotation ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn rotation_keeps_chain_verifiable() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        record_n(&chain, 2).await;

        let rotation = chain.update_signing_key(KEY_2).await.unwrap();
        assert_eq!(rotation.event, KEY_ROTATION_EVENT);

        let after = chain.record(login()).await.unwrap();
        chain.record(logout()).await.unwrap();

        // The boundary entry is signed with the outgoing key, later entries
        // with the new one.
        let k1 = SigningKey::new(KEY_1).unwrap();
        let k2 = SigningKey::new(KEY_2).unwrap();
        let rotation_hash = compute_entry_hash(&rotation);
        assert!(verify_signature(
            &rotation.integrity.signature,
            &sign(&rotation_hash, &rotation.integrity.previous_entry_hash, &k1),
        ));
        assert!(verify_signature(
            &after.integrity.signature,
            &sign(&compute_entry_hash(&after), &rotation_hash, &k2),
        ));

        let schedule = chain.key_schedule().await;
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].from_entry_id, rotation.id);
        assert_eq!(schedule[0].key, k1);

        assert_eq!(chain.verify().await.unwrap(), VerificationResult::valid(5));
    }

    #[tokio::test]
    async fn repeated_rotations_verify_each_segment() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        record_n(&chain, 1).await;
        chain.update_signing_key(KEY_2).await.unwrap();
        record_n(&chain, 1).await;
        chain
            .update_signing_key("k3-00000000000000000000000000000000")
            .await
            .unwrap();
        record_n(&chain, 1).await;

        assert_eq!(chain.key_schedule().await.len(), 2);
        assert_eq!(chain.verify().await.unwrap(), VerificationResult::valid(5));
    }

    #[tokio::test]
    async fn short_rotation_key_writes_nothing() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        record_n(&chain, 1).await;

        let err = chain.update_signing_key("short").await.unwrap_err();
        assert!(matches!(err, LedgerError::Configuration { .. }));
        assert_eq!(storage.snapshot().len(), 1);
        assert!(chain.key_schedule().await.is_empty());
    }

    #[tokio::test]
    async fn failed_rotation_append_keeps_old_key() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        record_n(&chain, 1).await;

        storage.fail_appends.store(true, Ordering::SeqCst);
        assert!(chain.update_signing_key(KEY_2).await.is_err());
        storage.fail_appends.store(false, Ordering::SeqCst);

        assert!(chain.key_schedule().await.is_empty());
        let next = chain.record(login()).await.unwrap();
        let k1 = SigningKey::new(KEY_1).unwrap();
        assert!(verify_signature(
            &next.integrity.signature,
            &sign(&compute_entry_hash(&next), &next.integrity.previous_entry_hash, &k1),
        ));
    }

    // ── Reload ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn reopened_chain_continues_from_stored_tail() {
        let storage = Arc::new(MockStorage::default());
        let first = make_chain(KEY_1, &storage);
        let written = record_n(&first, 2).await;
        drop(first);

        let reopened = make_chain(KEY_1, &storage);
        reopened.initialize().await.unwrap();
        let snapshot = reopened.create_snapshot().await.unwrap();
        assert_eq!(snapshot.last_hash, compute_entry_hash(&written[1]));
        assert_eq!(snapshot.last_entry_id.as_deref(), Some(written[1].id.as_str()));

        let next = reopened.record(login()).await.unwrap();
        assert_eq!(next.integrity.previous_entry_hash, snapshot.last_hash);
        assert_eq!(reopened.verify().await.unwrap(), VerificationResult::valid(3));
    }

    #[tokio::test]
    async fn reopened_chain_after_rotation_uses_seeded_schedule() {
        let storage = Arc::new(MockStorage::default());
        let first = make_chain(KEY_1, &storage);
        record_n(&first, 1).await;
        first.update_signing_key(KEY_2).await.unwrap();
        let schedule = first.key_schedule().await;
        drop(first);

        // The rotation entry is the tail and was signed with KEY_1.
        let reopened = make_chain(KEY_2, &storage).with_key_schedule(schedule);
        reopened.initialize().await.unwrap();
        reopened.record(logout()).await.unwrap();

        assert_eq!(reopened.verify().await.unwrap(), VerificationResult::valid(3));
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        chain.initialize().await.unwrap();
        chain.initialize().await.unwrap();
        assert_eq!(chain.status().await, ChainStatus::Ready);
        assert_eq!(chain.create_snapshot().await.unwrap().last_hash, GENESIS_HASH);
    }

    // ── Integrity compromise ─────────────────────────────────────────────────

    #[tokio::test]
    async fn wrong_key_on_reload_fails_closed() {
        let storage = Arc::new(MockStorage::default());
        record_n(&make_chain(KEY_1, &storage), 2).await;

        let reopened = make_chain(KEY_2, &storage);
        let err = reopened.initialize().await.unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityCompromised { .. }));
        assert!(!reopened.status().await.accepts_writes());

        let err = reopened.record(login()).await.unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityCompromised { .. }));
        let err = reopened.update_signing_key(KEY_1).await.unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityCompromised { .. }));
        assert_eq!(storage.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn tampered_tail_is_caught_on_first_record() {
        let storage = Arc::new(MockStorage::default());
        let written = record_n(&make_chain(KEY_1, &storage), 2).await;
        storage.tamper(1, |e| e.message = "TAMPERED".to_string());

        let reopened = make_chain(KEY_1, &storage);
        let err = reopened.record(login()).await.unwrap_err();
        assert!(matches!(err, LedgerError::IntegrityCompromised { .. }));

        // A snapshot is still available for remediation.
        let snapshot = reopened.create_snapshot().await.unwrap();
        assert_eq!(snapshot.entries_count, 2);
        assert_eq!(snapshot.last_entry_id.as_deref(), Some(written[1].id.as_str()));
    }

    // ── Stats & snapshot ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn stats_report_count_and_validity() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);
        let entries = record_n(&chain, 3).await;

        let stats = chain.get_stats().await.unwrap();
        assert_eq!(stats.entries_count, 3);
        assert!(stats.chain_valid);
        assert!(stats.last_verification > 0);

        storage.tamper(1, |e| e.level = "debug".to_string());
        let stats = chain.get_stats().await.unwrap();
        assert!(!stats.chain_valid);
        assert_eq!(stats.verification.broken_at.as_deref(), Some(entries[1].id.as_str()));
    }

    #[tokio::test]
    async fn snapshot_tracks_head() {
        let storage = Arc::new(MockStorage::default());
        let chain = make_chain(KEY_1, &storage);

        let empty = chain.create_snapshot().await.unwrap();
        assert_eq!(empty.entries_count, 0);
        assert_eq!(empty.last_hash, GENESIS_HASH);
        assert!(empty.last_entry_id.is_none());

        let last = record_n(&chain, 2).await.pop().unwrap();
        let snapshot = chain.create_snapshot().await.unwrap();
        assert_eq!(snapshot.entries_count, 2);
        assert_eq!(snapshot.last_hash, compute_entry_hash(&last));
        assert_eq!(snapshot.last_entry_id, Some(last.id.clone()));

        assert_eq!(chain.get_entry(&last.id).await.unwrap(), Some(last));
        assert!(chain.get_entry("missing").await.unwrap().is_none());
    }
}

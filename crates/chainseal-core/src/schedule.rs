//! Key schedule: which key signed which stretch of the chain.
//!
//! Rotations are appended in chain order. Record `i` says key `i` signed
//! everything up to and including its boundary entry; the active key signs
//! everything after the last boundary.

use chainseal_contracts::key::{KeyRotationRecord, SigningKey};

/// Ordered list of retired keys and their rotation boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySchedule {
    rotations: Vec<KeyRotationRecord>,
}

impl KeySchedule {
    pub fn new(rotations: Vec<KeyRotationRecord>) -> Self {
        Self { rotations }
    }

    /// Record that `retired` signed everything through `boundary_entry_id`.
    pub fn push(&mut self, boundary_entry_id: impl Into<String>, retired: SigningKey) {
        self.rotations.push(KeyRotationRecord {
            from_entry_id: boundary_entry_id.into(),
            key: retired,
        });
    }

    pub fn rotations(&self) -> &[KeyRotationRecord] {
        &self.rotations
    }

    /// The most recent rotation, if any.
    pub fn last(&self) -> Option<&KeyRotationRecord> {
        self.rotations.last()
    }

    /// Start a forward walk over the chain, ending on `active`.
    pub fn cursor<'a>(&'a self, active: &'a SigningKey) -> KeyCursor<'a> {
        KeyCursor {
            rotations: &self.rotations,
            active,
            position: 0,
        }
    }
}

/// Picks the signing key for each entry during a single forward pass.
///
/// Linear in the number of rotations over a whole pass.
#[derive(Debug)]
pub struct KeyCursor<'a> {
    rotations: &'a [KeyRotationRecord],
    active: &'a SigningKey,
    position: usize,
}

impl<'a> KeyCursor<'a> {
    /// The key expected to have signed the current entry.
    pub fn current(&self) -> &'a SigningKey {
        self.rotations
            .get(self.position)
            .map_or(self.active, |rotation| &rotation.key)
    }

    /// The boundary entry id of the current segment, if it is a retired one.
    pub fn boundary(&self) -> Option<&'a str> {
        self.rotations
            .get(self.position)
            .map(|rotation| rotation.from_entry_id.as_str())
    }

    /// Advance past `entry_id` once it has been checked.
    ///
    /// Moves to the next key only when `entry_id` is the current boundary,
    /// so the boundary entry itself is checked against the outgoing key.
    pub fn advance_past(&mut self, entry_id: &str) {
        if self.boundary() == Some(entry_id) {
            self.position += 1;
        }
    }

    /// Boundaries never reached during the walk.
    pub fn unreached(&self) -> &'a [KeyRotationRecord] {
        &self.rotations[self.position..]
    }
}

//! Signing keys and the key rotation record.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{LedgerError, LedgerResult};

/// Minimum signing key length, in characters.
pub const MIN_KEY_LENGTH: usize = 32;

/// An HMAC signing key.
///
/// Construction enforces `MIN_KEY_LENGTH`. The key material is wiped on drop
/// and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SigningKey(String);

impl SigningKey {
    /// Validate and wrap `key`.
    ///
    /// Returns `LedgerError::Configuration` when `key` has fewer than
    /// `MIN_KEY_LENGTH` characters.
    pub fn new(key: impl Into<String>) -> LedgerResult<Self> {
        let key = key.into();
        let len = key.chars().count();
        if len < MIN_KEY_LENGTH {
            return Err(LedgerError::Configuration {
                reason: format!(
                    "signing key must be at least {MIN_KEY_LENGTH} characters, got {len}"
                ),
            });
        }
        Ok(Self(key))
    }

    /// Raw key bytes for the MAC.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

impl TryFrom<String> for SigningKey {
    type Error = LedgerError;

    fn try_from(value: String) -> LedgerResult<Self> {
        Self::new(value)
    }
}

impl From<SigningKey> for String {
    fn from(key: SigningKey) -> Self {
        key.0.clone()
    }
}

/// Records that `key` signed every entry up to and including `from_entry_id`.
///
/// The boundary entry is the rotation event itself, which is always signed
/// with the outgoing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRotationRecord {
    pub from_entry_id: String,
    pub key: SigningKey,
}

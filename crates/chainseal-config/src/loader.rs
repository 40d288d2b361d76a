//! Loading, resolving, and saving `LedgerConfig`.

use std::path::Path;

use tracing::debug;

use chainseal_contracts::{
    error::{LedgerError, LedgerResult},
    key::{KeyRotationRecord, SigningKey},
};

use crate::config::LedgerConfig;

impl LedgerConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `LedgerError::Configuration` if the TOML is malformed, has
    /// unknown fields, or carries a key shorter than the minimum.
    pub fn from_toml_str(s: &str) -> LedgerResult<Self> {
        toml::from_str(s).map_err(|e| LedgerError::Configuration {
            reason: format!("failed to parse chainseal TOML: {}", e),
        })
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::Configuration {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!(
            path = %path.display(),
            retired_keys = config.retired_keys.len(),
            "loaded chainseal configuration"
        );
        Ok(config)
    }

    /// The active signing key: the literal `signing_key` if set, otherwise
    /// the value of the `signing_key_env` environment variable.
    ///
    /// Returns `LedgerError::Configuration` when neither is available or the
    /// key is too short.
    pub fn resolve_signing_key(&self) -> LedgerResult<SigningKey> {
        if let Some(key) = &self.signing_key {
            return Ok(key.clone());
        }
        let raw = std::env::var(&self.signing_key_env).map_err(|_| LedgerError::Configuration {
            reason: format!(
                "no signing_key configured and environment variable '{}' is not set",
                self.signing_key_env
            ),
        })?;
        SigningKey::new(raw)
    }

    /// Record a completed rotation.
    ///
    /// Appends the retired key to the schedule and, when the key was held
    /// literally in this config, replaces it with `new_key`.
    pub fn apply_rotation(&mut self, rotation: KeyRotationRecord, new_key: SigningKey) {
        self.retired_keys.push(rotation);
        if self.signing_key.is_some() {
            self.signing_key = Some(new_key);
        }
    }

    pub fn to_toml_string(&self) -> LedgerResult<String> {
        toml::to_string_pretty(self).map_err(|e| LedgerError::Configuration {
            reason: format!("failed to serialize chainseal configuration: {}", e),
        })
    }

    /// Write this configuration to `path` as TOML.
    pub fn save(&self, path: &Path) -> LedgerResult<()> {
        let contents = self.to_toml_string()?;
        std::fs::write(path, contents).map_err(|e| LedgerError::Configuration {
            reason: format!("failed to write config file '{}': {}", path.display(), e),
        })
    }
}

//! Schema-based entry validator.
//!
//! `JsonSchemaValidator` implements the `SchemaValidator` trait from
//! `chainseal-core`. The proposed `NewEntry` is serialized exactly as it
//! would be persisted (camelCase, absent optionals omitted) and checked
//! against a JSON Schema document. Every violation is collected before
//! returning so the caller sees the full failure set in one error.

use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, warn};

use chainseal_contracts::{
    entry::NewEntry,
    error::{LedgerError, LedgerResult},
};
use chainseal_core::traits::SchemaValidator;

/// Severity levels accepted by the built-in entry schema.
pub const DEFAULT_LEVELS: [&str; 5] = ["debug", "info", "warn", "error", "critical"];

/// The built-in schema for audit entry payloads.
///
/// Requires non-empty `event` and `message`, a `level` from
/// `DEFAULT_LEVELS`, non-empty identifiers when present, an object for
/// `metadata`, and nothing else.
pub fn default_entry_schema() -> Value {
    json!({
        "type": "object",
        "required": ["event", "level", "message"],
        "properties": {
            "event": { "type": "string", "minLength": 1, "maxLength": 128 },
            "level": { "enum": DEFAULT_LEVELS },
            "message": { "type": "string", "minLength": 1 },
            "userId": { "type": "string", "minLength": 1 },
            "taskId": { "type": "string", "minLength": 1 },
            "correlationId": { "type": "string", "minLength": 1 },
            "metadata": { "type": "object" }
        },
        "additionalProperties": false
    })
}

/// Validates entry payloads against a compiled JSON Schema.
pub struct JsonSchemaValidator {
    schema_id: String,
    validator: jsonschema::Validator,
}

impl JsonSchemaValidator {
    /// A validator using `default_entry_schema()`.
    pub fn new() -> LedgerResult<Self> {
        Self::from_schema("audit-entry-v1", &default_entry_schema())
    }

    /// Compile `schema` under the identifier `schema_id`.
    ///
    /// Returns `LedgerError::Configuration` if `schema` is not a valid JSON
    /// Schema document.
    pub fn from_schema(schema_id: impl Into<String>, schema: &Value) -> LedgerResult<Self> {
        let schema_id = schema_id.into();
        let validator = jsonschema::validator_for(schema).map_err(|e| LedgerError::Configuration {
            reason: format!("invalid entry schema '{schema_id}': {e}"),
        })?;
        Ok(Self {
            schema_id,
            validator,
        })
    }

    /// Read and compile the JSON Schema document at `path`.
    ///
    /// The file name is used as the schema identifier.
    pub fn from_file(path: &Path) -> LedgerResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LedgerError::Configuration {
            reason: format!("failed to read entry schema '{}': {}", path.display(), e),
        })?;
        let schema: Value = serde_json::from_str(&contents).map_err(|e| LedgerError::Configuration {
            reason: format!("entry schema '{}' is not valid JSON: {}", path.display(), e),
        })?;
        Self::from_schema(path.display().to_string(), &schema)
    }

    pub fn schema_id(&self) -> &str {
        &self.schema_id
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, fields: &NewEntry) -> LedgerResult<()> {
        let payload = serde_json::to_value(fields).map_err(|e| LedgerError::SchemaValidation {
            reason: format!("entry is not representable as JSON: {e}"),
        })?;

        let failures: Vec<String> = self
            .validator
            .iter_errors(&payload)
            .map(|error| {
                let path = error.instance_path.to_string();
                if path.is_empty() {
                    error.to_string()
                } else {
                    format!("{path}: {error}")
                }
            })
            .collect();

        if failures.is_empty() {
            debug!(schema_id = %self.schema_id, event = %fields.event, "entry passed schema validation");
            return Ok(());
        }

        let reason = failures.join("; ");
        warn!(schema_id = %self.schema_id, %reason, "entry failed schema validation");
        Err(LedgerError::SchemaValidation { reason })
    }
}

/// A validator that accepts every payload.
///
/// For hosts that validate entries before they reach the chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllValidator;

impl SchemaValidator for AcceptAllValidator {
    fn validate(&self, _fields: &NewEntry) -> LedgerResult<()> {
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

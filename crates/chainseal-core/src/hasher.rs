//! Entry content hashing.
//!
//! The hash covers the content fields only; the integrity block is the
//! output of hashing, never an input. Hash input is canonical JSON:
//!
//!   1. object keys sorted lexicographically, recursively (including every
//!      object nested inside `metadata`)
//!   2. absent optional fields omitted entirely
//!   3. no insignificant whitespace
//!
//! The canonical form is produced by walking the value here rather than
//! relying on `serde_json::Map` ordering, which changes with crate features.

use std::fmt::Write as _;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use chainseal_contracts::entry::AuditEntry;

/// Compute the SHA-256 content hash of `entry`.
///
/// Returns a lowercase 64-character hex string. Two entries with the same
/// logical content hash identically regardless of how their `metadata`
/// objects were built.
pub fn compute_entry_hash(entry: &AuditEntry) -> String {
    let canonical = canonical_json(&content_value(entry));
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// The hashed subset of an entry as a JSON object.
fn content_value(entry: &AuditEntry) -> Value {
    let mut content = Map::new();
    content.insert("id".to_string(), Value::String(entry.id.clone()));
    content.insert("event".to_string(), Value::String(entry.event.clone()));
    content.insert("level".to_string(), Value::String(entry.level.clone()));
    content.insert("message".to_string(), Value::String(entry.message.clone()));
    content.insert("timestamp".to_string(), Value::from(entry.timestamp));

    let optional = [
        ("userId", &entry.user_id),
        ("taskId", &entry.task_id),
        ("correlationId", &entry.correlation_id),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            content.insert(name.to_string(), Value::String(value.clone()));
        }
    }
    if let Some(metadata) = &entry.metadata {
        content.insert("metadata".to_string(), metadata.clone());
    }

    Value::Object(content)
}

/// Serialize `value` with recursively sorted object keys.
pub(crate) fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        // Scalars have a single serde_json rendering.
        other => {
            let _ = write!(out, "{other}");
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // Serializing a &str to JSON cannot fail.
    out.push_str(&Value::String(s.to_string()).to_string());
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use chainseal_contracts::entry::{IntegrityBlock, GENESIS_HASH, INTEGRITY_VERSION};

    use super::*;

    fn make_entry(metadata: Option<Value>) -> AuditEntry {
        AuditEntry {
            id: "0b7e6f52-5d43-4c4a-9d0e-2f0f3f7c1a11".to_string(),
            event: "login".to_string(),
            level: "info".to_string(),
            message: "user logged in".to_string(),
            user_id: Some("u-42".to_string()),
            task_id: None,
            correlation_id: None,
            metadata,
            timestamp: 1_700_000_000_000,
            integrity: IntegrityBlock {
                version: INTEGRITY_VERSION,
                signature: String::new(),
                previous_entry_hash: GENESIS_HASH.to_string(),
            },
        }
    }

    #[test]
    fn hash_is_64_lowercase_hex() {
        let hash = compute_entry_hash(&make_entry(None));
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_ignores_metadata_insertion_order() {
        let mut forward = Map::new();
        forward.insert("ip".to_string(), json!("10.0.0.1"));
        forward.insert("agent".to_string(), json!({ "os": "linux", "browser": "firefox" }));

        let mut reverse = Map::new();
        reverse.insert("agent".to_string(), json!({ "browser": "firefox", "os": "linux" }));
        reverse.insert("ip".to_string(), json!("10.0.0.1"));

        assert_eq!(
            compute_entry_hash(&make_entry(Some(Value::Object(forward)))),
            compute_entry_hash(&make_entry(Some(Value::Object(reverse)))),
        );
    }

    #[test]
    fn hash_excludes_integrity_block() {
        let a = make_entry(None);
        let mut b = a.clone();
        b.integrity.signature = "deadbeef".to_string();
        b.integrity.previous_entry_hash = "f".repeat(64);

        assert_eq!(compute_entry_hash(&a), compute_entry_hash(&b));
    }

    #[test]
    fn hash_changes_when_any_content_field_changes() {
        let base = make_entry(Some(json!({ "attempt": 1 })));
        let base_hash = compute_entry_hash(&base);

        let mut variants = Vec::new();
        let mut e = base.clone();
        e.message = "user logged in!".to_string();
        variants.push(e);
        let mut e = base.clone();
        e.timestamp += 1;
        variants.push(e);
        let mut e = base.clone();
        e.user_id = None;
        variants.push(e);
        let mut e = base.clone();
        e.correlation_id = Some("c-1".to_string());
        variants.push(e);
        let mut e = base.clone();
        e.metadata = Some(json!({ "attempt": 2 }));
        variants.push(e);

        for variant in variants {
            assert_ne!(compute_entry_hash(&variant), base_hash);
        }
    }

    #[test]
    fn canonical_json_sorts_nested_keys() {
        let value = json!({ "b": [ { "z": 1, "a": null } ], "a": "x\"y" });
        assert_eq!(
            canonical_json(&value),
            r#"{"a":"x\"y","b":[{"a":null,"z":1}]}"#
        );
    }
}

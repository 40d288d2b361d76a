//! `chainseal demo`: an in-memory walkthrough.
//!
//! Records a login and a logout, rotates the signing key, tampers with the
//! first entry behind the chain's back, and shows `verify` pinpointing it.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use chainseal_contracts::{
    entry::NewEntry,
    error::{LedgerError, LedgerResult},
    report::VerificationResult,
};
use chainseal_core::AuditChain;
use chainseal_schema::JsonSchemaValidator;
use chainseal_storage::MemoryStorage;

const DEMO_KEY: &str = "demo-signing-key-0001-not-for-production";
const DEMO_NEXT_KEY: &str = "demo-signing-key-0002-not-for-production";

pub async fn run() -> LedgerResult<()> {
    println!();
    println!("chainseal — tamper-evident audit log");
    println!("In-memory walkthrough");
    println!("=====================");
    println!();
    println!("Each entry is sealed in three steps:");
    println!("  [1] SHA-256 over the canonical JSON of its content");
    println!("  [2] linked to the previous entry's hash (genesis: 64 zeros)");
    println!("  [3] HMAC-SHA256 over \"hash:previous\" with the active key");
    println!();

    let storage = Arc::new(MemoryStorage::new());
    let chain = AuditChain::new(DEMO_KEY, storage.clone(), Box::new(JsonSchemaValidator::new()?))?;
    chain.initialize().await?;

    // ── Step 1: record ────────────────────────────────────────────────────────
    println!("=== Step 1: record ===");
    let login = chain
        .record(
            NewEntry::new("login", "info", "user logged in")
                .with_user_id("u-1")
                .with_metadata(json!({ "ip": "10.0.0.7" })),
        )
        .await?;
    print_entry(&login.id, &login.event, &login.integrity.previous_entry_hash);

    let logout = chain
        .record(NewEntry::new("logout", "info", "user logged out").with_user_id("u-1"))
        .await?;
    print_entry(&logout.id, &logout.event, &logout.integrity.previous_entry_hash);
    println!();

    println!("=== Step 2: verify ===");
    print_result(&chain.verify().await?);
    println!();

    // ── Step 3: rotate ────────────────────────────────────────────────────────
    println!("=== Step 3: rotate the signing key ===");
    let rotation = chain.update_signing_key(DEMO_NEXT_KEY).await?;
    print_entry(&rotation.id, &rotation.event, &rotation.integrity.previous_entry_hash);
    let after = chain
        .record(NewEntry::new("export", "warn", "report exported").with_task_id("t-42"))
        .await?;
    print_entry(&after.id, &after.event, &after.integrity.previous_entry_hash);
    println!("  Retired keys:   {}", chain.key_schedule().await.len());
    print_result(&chain.verify().await?);
    println!();

    // ── Step 4: tamper ────────────────────────────────────────────────────────
    println!("=== Step 4: tamper with the first entry ===");
    let found = storage.tamper_with(&login.id, |entry| entry.message = "TAMPERED".to_string())?;
    if !found {
        return Err(LedgerError::Storage {
            reason: format!("demo entry '{}' vanished from storage", login.id),
        });
    }
    println!("  Rewrote message of {} in storage", login.id);
    let result = chain.verify().await?;
    print_result(&result);
    if result.broken_at.as_deref() == Some(login.id.as_str()) {
        println!("  Detection:      broken link points at the tampered entry");
    }
    println!();

    println!("=== Step 5: snapshot ===");
    let snapshot = chain.create_snapshot().await?;
    println!("  Entries:        {}", snapshot.entries_count);
    println!("  Last entry:     {}", snapshot.last_entry_id.as_deref().unwrap_or("-"));
    println!("  Last hash:      {}", snapshot.last_hash);
    println!();

    info!(entries = snapshot.entries_count, "demo finished");
    println!("Demo complete.");
    Ok(())
}

fn print_entry(id: &str, event: &str, previous: &str) {
    println!("  {event:<14} {id}  prev={}…", &previous[..previous.len().min(12)]);
}

fn print_result(result: &VerificationResult) {
    if result.valid {
        println!("  Verification:   PASS ({} entries)", result.entries_checked);
    } else {
        println!(
            "  Verification:   FAIL at {} after {} entries",
            result.broken_at.as_deref().unwrap_or("?"),
            result.entries_checked
        );
        if let Some(error) = &result.error {
            println!("  Reason:         {error}");
        }
    }
}

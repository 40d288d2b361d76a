//! # chainseal-storage
//!
//! Append-only `AuditStorage` backends for the chainseal audit chain.
//!
//! ## Overview
//!
//! - [`MemoryStorage`]: ordered arena plus id index, in process only
//! - [`JsonlFileStorage`]: one JSON entry per line, synced on every append
//!
//! Both persist the full `AuditEntry` including its integrity block, so a
//! chain written through one can be verified through any other.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use chainseal_core::AuditChain;
//! use chainseal_storage::JsonlFileStorage;
//!
//! let storage = Arc::new(JsonlFileStorage::open("var/audit.jsonl").await?);
//! let chain = AuditChain::new(key, storage, validator)?;
//! chain.initialize().await?;
//! ```

pub mod file;
pub mod memory;

pub use file::JsonlFileStorage;
pub use memory::MemoryStorage;

// ── Tests ─────────────────────────────────────────────────────────────────────

//! # chainseal-core
//!
//! The hash-chain integrity engine.
//!
//! This crate provides:
//! - The collaborator traits (`AuditStorage`, `SchemaValidator`)
//! - Entry hashing (`hasher`) and HMAC signing (`signer`)
//! - The `KeySchedule` that maps chain segments to retired keys
//! - The `AuditChain` that ties them together as the single writer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use chainseal_core::{AuditChain, traits::{AuditStorage, SchemaValidator}};
//! ```

pub mod chain;
pub mod hasher;
pub mod schedule;
pub mod signer;
pub mod traits;

pub use chain::AuditChain;
pub use hasher::compute_entry_hash;
pub use schedule::KeySchedule;
pub use signer::{sign, verify_signature};
pub use traits::{AuditStorage, EntryStream, SchemaValidator};

//! # chainseal-config
//!
//! TOML configuration for a chainseal deployment.
//!
//! ## Overview
//!
//! [`LedgerConfig`] names the signing key (literally or through an
//! environment variable), the storage file, an optional entry schema, and the
//! keys retired by earlier rotations. Every field has a default.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use chainseal_config::LedgerConfig;
//!
//! let config = LedgerConfig::from_file(Path::new("chainseal.toml"))?;
//! let key = config.resolve_signing_key()?;
//! ```

pub mod config;
pub mod loader;

pub use config::{LedgerConfig, SchemaConfig, StorageConfig, DEFAULT_SIGNING_KEY_ENV};

// ── Tests ─────────────────────────────────────────────────────────────────────

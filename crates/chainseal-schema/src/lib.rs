//! # chainseal-schema
//!
//! Payload validation for the chainseal audit chain.
//!
//! This crate provides [`validator::JsonSchemaValidator`], which implements
//! the [`chainseal_core::traits::SchemaValidator`] trait with the `jsonschema`
//! crate, and [`validator::AcceptAllValidator`] for hosts that validate
//! upstream.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use chainseal_schema::JsonSchemaValidator;
//!
//! let validator = JsonSchemaValidator::new()?;               // built-in entry schema
//! let strict = JsonSchemaValidator::from_file(schema_path)?; // operator-supplied schema
//! ```

pub mod validator;

pub use validator::{default_entry_schema, AcceptAllValidator, JsonSchemaValidator, DEFAULT_LEVELS};

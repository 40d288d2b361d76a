//! chainseal: command line for a tamper-evident audit log.
//!
//! Every subcommand opens the chain described by the configuration file
//! (signing key, storage file, entry schema, retired keys) and runs one
//! operation against it.
//!
//! Usage:
//!   chainseal --config chainseal.toml record --event login --level info --message "user logged in"
//!   chainseal --config chainseal.toml verify
//!   chainseal --config chainseal.toml rotate-key --new-key-env NEXT_SIGNING_KEY
//!   chainseal demo

mod demo;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chainseal_config::LedgerConfig;
use chainseal_contracts::{
    entry::NewEntry,
    error::{LedgerError, LedgerResult},
    key::SigningKey,
};
use chainseal_core::{AuditChain, AuditStorage, SchemaValidator};
use chainseal_schema::JsonSchemaValidator;
use chainseal_storage::{JsonlFileStorage, MemoryStorage};

// ── CLI definition ────────────────────────────────────────────────────────────

/// chainseal: tamper-evident, HMAC-signed, hash-chained audit log.
#[derive(Parser)]
#[command(
    name = "chainseal",
    about = "Record and verify a tamper-evident audit log",
    long_about = "Every entry is hashed, linked to its predecessor, and HMAC-signed.\n\
                  `verify` replays the whole log and reports the first entry that\n\
                  no longer checks out."
)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append one entry to the log.
    Record {
        #[arg(long)]
        event: String,
        #[arg(long, default_value = "info")]
        level: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        user_id: Option<String>,
        #[arg(long)]
        task_id: Option<String>,
        #[arg(long)]
        correlation_id: Option<String>,
        /// Extra context as a JSON object.
        #[arg(long)]
        metadata: Option<String>,
    },
    /// Replay the full log and report the first break, if any.
    Verify,
    /// Entry count plus a full verification pass.
    Stats,
    /// Capture head metadata without walking the log.
    Snapshot,
    /// Print one entry by id.
    Show { id: String },
    /// Rotate the signing key and record the rotation in the log.
    RotateKey {
        /// Environment variable holding the new key.
        #[arg(long)]
        new_key_env: String,
    },
    /// In-memory walkthrough: record, rotate, tamper, and detect.
    Demo,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match LedgerConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("chainseal: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => LedgerConfig::default(),
    };

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .compact()
        .init();

    match run(cli, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("chainseal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: LedgerConfig) -> LedgerResult<ExitCode> {
    match cli.command {
        Command::Record {
            event,
            level,
            message,
            user_id,
            task_id,
            correlation_id,
            metadata,
        } => {
            let metadata = metadata
                .map(|raw| {
                    serde_json::from_str(&raw).map_err(|e| LedgerError::SchemaValidation {
                        reason: format!("--metadata is not valid JSON: {e}"),
                    })
                })
                .transpose()?;
            let fields = NewEntry {
                event,
                level,
                message,
                user_id,
                task_id,
                correlation_id,
                metadata,
            };
            let chain = open_chain(&config).await?;
            let entry = chain.record(fields).await?;
            print_json(&entry);
        }

        Command::Verify => {
            let result = open_chain(&config).await?.verify().await?;
            print_json(&result);
            if !result.valid {
                return Ok(ExitCode::from(2));
            }
        }

        Command::Stats => {
            let stats = open_chain(&config).await?.get_stats().await?;
            print_json(&stats);
        }

        Command::Snapshot => {
            let snapshot = open_chain(&config).await?.create_snapshot().await?;
            print_json(&snapshot);
        }

        Command::Show { id } => match open_chain(&config).await?.get_entry(&id).await? {
            Some(entry) => print_json(&entry),
            None => {
                eprintln!("chainseal: no entry with id '{id}'");
                return Ok(ExitCode::FAILURE);
            }
        },

        Command::RotateKey { new_key_env } => {
            let raw = std::env::var(&new_key_env).map_err(|_| LedgerError::Configuration {
                reason: format!("environment variable '{new_key_env}' is not set"),
            })?;
            let new_key = SigningKey::new(raw)?;
            let chain = open_chain(&config).await?;
            let rotation_entry = chain.update_signing_key(new_key.clone()).await?;
            print_json(&rotation_entry);

            match &cli.config {
                Some(path) => persist_rotation(path, config, &chain, new_key).await?,
                None => warn!(
                    "no --config given; the retired key is not persisted and entries signed \
                     with it will not verify after restart"
                ),
            }
        }

        Command::Demo => demo::run().await?,
    }

    Ok(ExitCode::SUCCESS)
}

// ── Chain wiring ──────────────────────────────────────────────────────────────

/// Build the chain described by `config` and load its head.
async fn open_chain(config: &LedgerConfig) -> LedgerResult<AuditChain> {
    let storage: Arc<dyn AuditStorage> = match &config.storage.path {
        Some(path) => {
            let storage = JsonlFileStorage::open(path).await?;
            info!(path = %storage.path().display(), "using audit log file");
            Arc::new(storage)
        }
        None => {
            warn!("no storage.path configured; entries are kept in memory and lost on exit");
            Arc::new(MemoryStorage::new())
        }
    };

    let validator = match &config.schema.path {
        Some(path) => JsonSchemaValidator::from_file(path)?,
        None => JsonSchemaValidator::new()?,
    };
    info!(schema_id = %validator.schema_id(), "entry schema loaded");
    let validator: Box<dyn SchemaValidator> = Box::new(validator);

    let key = config.resolve_signing_key()?;
    let chain = AuditChain::new(key, storage, validator)?
        .with_key_schedule(config.retired_keys.clone());
    chain.initialize().await?;
    Ok(chain)
}

/// Write the rotation into the config file so the next process can verify
/// the segment signed with the retired key.
async fn persist_rotation(
    path: &Path,
    mut config: LedgerConfig,
    chain: &AuditChain,
    new_key: SigningKey,
) -> LedgerResult<()> {
    let Some(rotation) = chain.key_schedule().await.pop() else {
        return Ok(());
    };

    let literal = config.signing_key.is_some();
    config.apply_rotation(rotation, new_key);
    config.save(path)?;
    info!(path = %path.display(), "key schedule saved");

    if !literal {
        println!(
            "Rotation saved to {}. Update {} to the new key before the next run.",
            path.display(),
            config.signing_key_env
        );
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("chainseal: failed to render output: {e}"),
    }
}

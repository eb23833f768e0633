//! dstore command line interface
//!
//! Runs a datastore against a local registry persisted under a data
//! directory: ledger state in `ledger.json`, encrypted blobs in `blobs/`,
//! and the encryption key in `key.hex`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dstore_core::{Datastore, DatastoreConfig, LogFormat, StorageBackend};
use dstore_crypto::Aes256GcmEncryption;
use dstore_rpc::{LocalRpcProvider, MemoryLedger};
use dstore_types::{EntityId, EventFilter, FileId};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LEDGER_FILE: &str = "ledger.json";
const BLOB_DIR: &str = "blobs";
const KEY_FILE: &str = "key.hex";

#[derive(Parser)]
#[command(name = "dstore")]
#[command(about = "Decentralized file registry command line interface", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the ledger, blobs, and key
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Entity the ledger calls are made as
    #[arg(long = "as", value_name = "ENTITY", default_value = "local")]
    caller: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file and register it
    Add {
        /// Name recorded on the ledger
        name: String,
        /// File to read
        path: PathBuf,
    },
    /// Fetch a file's content
    Get {
        id: u64,
        /// Write content here and print the record instead of raw bytes
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
    },
    /// Show a file's metadata
    Info { id: u64 },
    /// List every registered file
    List,
    /// Replace a file's content
    Update { id: u64, path: PathBuf },
    /// Rename a file
    Rename { id: u64, name: String },
    /// Allow an entity to write a file
    Grant { id: u64, entity: String },
    /// Revoke an entity's write permission
    Revoke { id: u64, entity: String },
    /// Show the ledger event log
    History {
        /// Only events for this file
        #[arg(long)]
        file: Option<u64>,
    },
}

impl Commands {
    fn mutates(&self) -> bool {
        matches!(
            self,
            Commands::Add { .. }
                | Commands::Update { .. }
                | Commands::Rename { .. }
                | Commands::Grant { .. }
                | Commands::Revoke { .. }
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        DatastoreConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&config.log.level, config.log.format)?;

    let data_dir = resolve_data_dir(cli.data_dir);
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;
    debug!(data_dir = %data_dir.display(), "using data directory");

    // Blobs have to outlive the process, so the memory backend is never used here.
    config.storage.backend = StorageBackend::Fs;
    config
        .storage
        .path
        .get_or_insert_with(|| data_dir.join(BLOB_DIR));
    if config.encryption.key.is_none() {
        config.encryption.key = Some(ensure_key(&data_dir.join(KEY_FILE)).await?);
    }

    let caller = EntityId::new(&cli.caller).context("invalid --as entity")?;
    let ledger_path = data_dir.join(LEDGER_FILE);
    let ledger = MemoryLedger::load_from(&ledger_path, caller)
        .await
        .with_context(|| format!("failed to load ledger {}", ledger_path.display()))?;

    let rpc = Arc::new(LocalRpcProvider::new(ledger.clone()));
    let datastore = Datastore::new(config.into_options(rpc).await?)?;

    let mutates = cli.command.mutates();
    run(cli.command, &datastore, &ledger).await?;

    if mutates {
        ledger
            .save_to(&ledger_path)
            .await
            .with_context(|| format!("failed to save ledger {}", ledger_path.display()))?;
    }

    Ok(())
}

async fn run(command: Commands, datastore: &Datastore, ledger: &MemoryLedger) -> Result<()> {
    match command {
        Commands::Add { name, path } => {
            let bytes = read_input(&path).await?;
            let file_id = datastore.add_file(&name, &bytes).await?;
            info!(%file_id, name = %name, "file added");
            print_json(&datastore.get_file_info(file_id).await?)?;
        }
        Commands::Get { id, out } => {
            let mut record = datastore.get_file(file_id(id)?).await?;
            match out {
                Some(out) => {
                    let content = record.content.take().unwrap_or_default();
                    tokio::fs::write(&out, content)
                        .await
                        .with_context(|| format!("failed to write {}", out.display()))?;
                    print_json(&record)?;
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(record.content.as_deref().unwrap_or_default())?;
                    stdout.flush()?;
                }
            }
        }
        Commands::Info { id } => {
            print_json(&datastore.get_file_info(file_id(id)?).await?)?;
        }
        Commands::List => {
            print_json(&datastore.list_files().await?)?;
        }
        Commands::Update { id, path } => {
            let file_id = file_id(id)?;
            let bytes = read_input(&path).await?;
            datastore.set_file_content(file_id, &bytes).await?;
            print_json(&datastore.get_file_info(file_id).await?)?;
        }
        Commands::Rename { id, name } => {
            let file_id = file_id(id)?;
            datastore.set_filename(file_id, &name).await?;
            print_json(&datastore.get_file_info(file_id).await?)?;
        }
        Commands::Grant { id, entity } => {
            let entity = EntityId::new(&entity)?;
            datastore
                .set_write_permission(file_id(id)?, &entity, true)
                .await?;
            println!("Granted write access on file {id} to {entity}");
        }
        Commands::Revoke { id, entity } => {
            let entity = EntityId::new(&entity)?;
            datastore
                .set_write_permission(file_id(id)?, &entity, false)
                .await?;
            println!("Revoked write access on file {id} from {entity}");
        }
        Commands::History { file } => {
            let filter = match file {
                Some(id) => EventFilter::for_file(file_id(id)?),
                None => EventFilter::default(),
            };
            print_json(&ledger.history(&filter))?;
        }
    }

    Ok(())
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init()?,
    }

    Ok(())
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        dirs::data_local_dir()
            .map(|dir| dir.join("dstore"))
            .unwrap_or_else(|| PathBuf::from(".dstore"))
    })
}

/// Read the hex key at `path`, generating and saving one when absent.
async fn ensure_key(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(existing) => Ok(existing.trim().to_string()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let key = Aes256GcmEncryption::generate().key_hex();
            tokio::fs::write(path, &key)
                .await
                .with_context(|| format!("failed to write key file {}", path.display()))?;
            info!(path = %path.display(), "generated encryption key");
            Ok(key)
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to read key file {}", path.display()))
        }
    }
}

async fn read_input(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn file_id(raw: u64) -> Result<FileId> {
    Ok(FileId::new(raw)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

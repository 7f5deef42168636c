mod cli;
mod config;
mod entries;
mod storage;

use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use serde_json::Value;
use strongbox_core::{CryptoProvider, StorageMedium};
use strongbox_storage::{EncryptedStore, MigrationOutcome, SavedState};
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Command, ConfigCommand, StateCommand, StoreCommand};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load()?;
    match cli.command {
        Command::Version => print_version(),
        Command::Config(ConfigCommand::Init) => init_config(&config)?,
        Command::Health => run_health_check(&config).await?,
        Command::Store(command) => run_store_command(command, &config).await?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info; logs go to stderr so stdout stays parseable.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn print_version() {
    println!("strongbox {}", env!("CARGO_PKG_VERSION"));
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}

async fn run_store_command(command: StoreCommand, config: &config::Config) -> Result<()> {
    let store = storage::store_from_config(config)?;
    let output = match command {
        StoreCommand::Set { key, value } => entries::set(&store, &key, &value).await?,
        StoreCommand::Get { key } => entries::get(&store, &key).await?,
        StoreCommand::Has { key } => store.has_item(&key).to_string(),
        StoreCommand::Remove { key } => {
            store.remove_item(&key)?;
            format!("Removed {key}")
        }
        StoreCommand::Keys => entries::list(&store)?,
        StoreCommand::Clear => {
            store.clear()?;
            "Cleared all encrypted entries (data key kept)".to_string()
        }
        StoreCommand::Migrate { key } => entries::migrate(&store, &key).await,
        StoreCommand::State(cmd) => run_state(cmd, Arc::new(store), config.state_key()).await?,
        StoreCommand::ResetKey { yes } => {
            if !yes {
                color_eyre::eyre::bail!(
                    "reset-key deletes the data key and every encrypted entry; rerun with --yes"
                );
            }
            warn!("operator requested key reset");
            store.reset_key_material().await?;
            "Key material and encrypted entries removed".to_string()
        }
    };
    println!("{output}");
    Ok(())
}

async fn run_state<M: StorageMedium, C: CryptoProvider>(
    cmd: StateCommand,
    store: Arc<EncryptedStore<M, C>>,
    key: &str,
) -> Result<String> {
    let state: SavedState<Value, M, C> = SavedState::with_key(store, key);
    match cmd {
        StateCommand::Show => {
            if state.migrate_legacy().await == MigrationOutcome::Migrated {
                warn!(key, "saved state was stored in plaintext; it is now encrypted");
            }
            Ok(match state.load().await {
                Some(value) => serde_json::to_string_pretty(&value)?,
                None => "No saved state".to_string(),
            })
        }
        StateCommand::Clear => {
            state.clear()?;
            Ok("Saved state cleared".to_string())
        }
    }
}

/// Runs a quick health check of the encrypted storage path.
async fn run_health_check(config: &config::Config) -> Result<()> {
    let store = storage::store_from_config(config)?;
    run_store_health(&store).await?;
    println!("Storage: ok ({})", store.medium().root().display());
    Ok(())
}

async fn run_store_health<M: StorageMedium, C: CryptoProvider>(
    store: &EncryptedStore<M, C>,
) -> Result<()> {
    let probe_key = "health/probe";
    let payload = serde_json::json!({"probe": "ok"});
    store.set_item(probe_key, &payload).await?;
    let round_trip: Option<Value> = store.get_item(probe_key).await;
    store.remove_item(probe_key)?;

    if round_trip.as_ref() != Some(&payload) {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    Ok(())
}

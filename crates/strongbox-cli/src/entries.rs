use color_eyre::Result;
use serde_json::Value;
use strongbox_core::{CryptoProvider, StorageMedium};
use strongbox_storage::{EncryptedStore, MigrationOutcome};

/// Store a JSON value given on the command line.
pub async fn set<M: StorageMedium, C: CryptoProvider>(
    store: &EncryptedStore<M, C>,
    key: &str,
    raw: &str,
) -> Result<String> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| color_eyre::eyre::eyre!("value must be JSON: {e}"))?;
    store.set_item(key, &value).await?;
    Ok(format!("Stored {key}"))
}

pub async fn get<M: StorageMedium, C: CryptoProvider>(
    store: &EncryptedStore<M, C>,
    key: &str,
) -> Result<String> {
    match store.get_item::<Value>(key).await {
        Some(value) => Ok(serde_json::to_string_pretty(&value)?),
        None => Ok(format!("No readable entry for {key}")),
    }
}

pub fn list<M: StorageMedium, C: CryptoProvider>(store: &EncryptedStore<M, C>) -> Result<String> {
    let mut keys = store.keys()?;
    if keys.is_empty() {
        return Ok("No entries yet. Add one with `strongbox set <key> <json>`.".to_string());
    }
    keys.sort();
    Ok(keys.join("\n"))
}

pub async fn migrate<M: StorageMedium, C: CryptoProvider>(
    store: &EncryptedStore<M, C>,
    key: &str,
) -> String {
    match store.migrate_legacy_data(key).await {
        MigrationOutcome::Migrated => format!("Migrated legacy record {key}"),
        MigrationOutcome::AlreadyMigrated => {
            format!("{key} already has an encrypted entry; legacy record left in place")
        }
        MigrationOutcome::NothingToMigrate => format!("No legacy record for {key}"),
        MigrationOutcome::Failed => format!("Migration of {key} failed; see logs"),
    }
}

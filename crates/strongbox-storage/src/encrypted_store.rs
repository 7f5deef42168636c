use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use strongbox_core::{CryptoProvider, StorageMedium, StoreError, WriteError};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::{
    envelope::{Envelope, EnvelopeCodec},
    key_provider::{KeyManager, DEFAULT_KEY_SLOT},
};

/// Default namespace prefix for encrypted entries.
pub const DEFAULT_PREFIX: &str = "secure_";

/// Slot layout of a store inside its medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Prefix prepended to every logical key.
    pub prefix: String,
    /// Slot holding the exported key material.
    pub key_slot: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            key_slot: DEFAULT_KEY_SLOT.to_string(),
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<(), StoreError> {
        if self.prefix.is_empty() {
            return Err(StoreError::InvalidConfig {
                reason: "namespace prefix must not be empty".to_string(),
            });
        }
        if self.key_slot.is_empty() || self.key_slot.starts_with(&self.prefix) {
            return Err(StoreError::InvalidConfig {
                reason: format!(
                    "key slot {:?} must be non-empty and outside prefix {:?}",
                    self.key_slot, self.prefix
                ),
            });
        }
        Ok(())
    }
}

/// What a call to [`EncryptedStore::migrate_legacy_data`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Legacy record re-saved encrypted and removed.
    Migrated,
    /// An encrypted entry already exists; the legacy record was left alone.
    AlreadyMigrated,
    NothingToMigrate,
    /// Legacy record kept in place; the cause was logged.
    Failed,
}

/// Encrypted key-value store over an untrusted [`StorageMedium`].
///
/// Writes are loud: any failure is returned and nothing is persisted. Reads are quiet: an
/// entry that cannot be read for any reason is reported as absent.
pub struct EncryptedStore<M, C> {
    medium: Arc<M>,
    keys: KeyManager<M, C>,
    codec: EnvelopeCodec<C>,
    prefix: String,
    /// Writes hold it shared from key lookup to persist; a key reset holds it exclusively.
    reset_gate: RwLock<()>,
}

impl<M: StorageMedium, C: CryptoProvider> EncryptedStore<M, C> {
    pub fn new(medium: M, crypto: C) -> Self {
        let config = StoreConfig::default();
        Self::build(Arc::new(medium), Arc::new(crypto), config)
    }

    pub fn with_config(medium: M, crypto: C, config: StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self::build(Arc::new(medium), Arc::new(crypto), config))
    }

    fn build(medium: Arc<M>, crypto: Arc<C>, config: StoreConfig) -> Self {
        debug!(prefix = %config.prefix, key_slot = %config.key_slot, "initializing encrypted store");
        Self {
            keys: KeyManager::new(medium.clone(), crypto.clone(), config.key_slot),
            codec: EnvelopeCodec::new(crypto),
            medium,
            prefix: config.prefix,
            reset_gate: RwLock::new(()),
        }
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    pub fn key_manager(&self) -> &KeyManager<M, C> {
        &self.keys
    }

    /// Medium slot backing a logical key.
    pub fn slot_for(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Encrypt and persist `value`, replacing any previous entry.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn set_item<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), WriteError> {
        self.write(key, value)
            .await
            .map_err(|err| WriteError::new(key, err))
    }

    async fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let plaintext = EnvelopeCodec::<C>::serialize(value)?;
        let _writing = self.reset_gate.read().await;
        let data_key = self.keys.get_or_create().await?;
        let record = self.codec.seal(&data_key, &plaintext).await?.to_record()?;
        self.medium.set(&self.slot_for(key), record)?;
        Ok(())
    }

    /// Read and decrypt an entry. Missing, corrupt, foreign or otherwise unreadable entries
    /// all come back as `None`.
    #[instrument(skip_all, fields(key = %key))]
    pub async fn get_item<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let record = match self.medium.get(&self.slot_for(key)) {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(err) => {
                warn!(error = %err, "entry read failed, treating as absent");
                return None;
            }
        };

        let data_key = match self.keys.load().await {
            Ok(Some(data_key)) => data_key,
            Ok(None) => {
                warn!("entry present but no key material, treating as absent");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "key unavailable, treating entry as absent");
                return None;
            }
        };

        let decoded = match Envelope::from_record(&record) {
            Ok(envelope) => self.codec.decode(&data_key, &envelope).await,
            Err(err) => Err(err),
        };
        match decoded {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(error = %err, "entry could not be decoded, treating as absent");
                None
            }
        }
    }

    /// Delete an entry. Missing entries are not an error.
    #[instrument(skip_all, fields(key = %key))]
    pub fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.medium.remove(&self.slot_for(key))?;
        Ok(())
    }

    /// Whether an envelope exists. Does not decrypt, so a `true` entry may still read as
    /// absent.
    pub fn has_item(&self, key: &str) -> bool {
        match self.medium.contains(&self.slot_for(key)) {
            Ok(present) => present,
            Err(err) => {
                warn!(key, error = %err, "existence check failed");
                false
            }
        }
    }

    /// Logical keys currently stored under the namespace.
    pub fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .medium
            .keys()?
            .into_iter()
            .filter_map(|slot| slot.strip_prefix(&self.prefix).map(str::to_string))
            .collect())
    }

    /// Remove every namespaced entry. Unrelated slots and the key material are kept, so
    /// later writes reuse the same key.
    #[instrument(skip_all)]
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut removed = 0usize;
        for slot in self.medium.keys()? {
            if slot.starts_with(&self.prefix) {
                self.medium.remove(&slot)?;
                removed += 1;
            }
        }
        debug!(removed, "cleared namespaced entries");
        Ok(())
    }

    /// Re-encrypt a plaintext record stored under the bare `legacy_key`.
    ///
    /// Safe to call repeatedly; an existing encrypted entry is never overwritten. Failures
    /// are logged and leave the legacy record in place. The key slot and namespaced slots
    /// are never treated as legacy records.
    #[instrument(skip_all, fields(key = %legacy_key))]
    pub async fn migrate_legacy_data(&self, legacy_key: &str) -> MigrationOutcome {
        if legacy_key == self.keys.slot() || legacy_key.starts_with(&self.prefix) {
            warn!("slot is owned by the store, refusing to migrate it");
            return MigrationOutcome::Failed;
        }

        let legacy = match self.medium.get(legacy_key) {
            Ok(Some(legacy)) => legacy,
            Ok(None) => return MigrationOutcome::NothingToMigrate,
            Err(err) => {
                warn!(error = %err, "legacy read failed, skipping migration");
                return MigrationOutcome::Failed;
            }
        };

        if self.has_item(legacy_key) {
            debug!("encrypted entry already present, legacy record left untouched");
            return MigrationOutcome::AlreadyMigrated;
        }

        let value: serde_json::Value = match serde_json::from_str(&legacy) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "legacy record is not valid JSON, skipping migration");
                return MigrationOutcome::Failed;
            }
        };

        if let Err(err) = self.set_item(legacy_key, &value).await {
            warn!(error = %err, cause = %err.source, "could not re-save legacy record");
            return MigrationOutcome::Failed;
        }

        if let Err(err) = self.medium.remove(legacy_key) {
            // Encrypted copy exists, so the next call reports AlreadyMigrated.
            warn!(error = %err, "migrated but could not delete legacy record");
        }
        debug!("legacy record migrated");
        MigrationOutcome::Migrated
    }

    /// Operator reset for unusable key material: drops every namespaced entry and the key
    /// itself. The next write generates a fresh key. In-flight writes finish first and no
    /// write starts until the reset is done, so no entry outlives the key it was sealed with.
    #[instrument(skip_all)]
    pub async fn reset_key_material(&self) -> Result<(), StoreError> {
        let _resetting = self.reset_gate.write().await;
        self.clear()?;
        self.keys.discard().await
    }
}

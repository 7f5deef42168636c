use std::sync::Arc;

use strongbox_core::{CryptoProvider, DataKey, ExportedKey, StorageMedium, StoreError};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Default slot holding the exported key material. Never carries the entry prefix.
pub const DEFAULT_KEY_SLOT: &str = "app_encryption_key";

/// Owns the lifecycle of the per-medium data key.
///
/// The key is persisted as JSON next to the data it protects. Once present it is always
/// reused; a slot that cannot be parsed is reported as [`StoreError::CorruptKeyMaterial`]
/// and is never overwritten implicitly, because a new key would orphan every existing
/// envelope.
pub struct KeyManager<M, C> {
    medium: Arc<M>,
    crypto: Arc<C>,
    slot: String,
    /// Serializes read-then-create so concurrent first use yields a single key.
    init_gate: Mutex<()>,
}

impl<M: StorageMedium, C: CryptoProvider> KeyManager<M, C> {
    pub fn new(medium: Arc<M>, crypto: Arc<C>, slot: impl Into<String>) -> Self {
        Self {
            medium,
            crypto,
            slot: slot.into(),
            init_gate: Mutex::new(()),
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Load the stored key, generating and persisting one on first use.
    #[instrument(skip_all, fields(slot = %self.slot))]
    pub async fn get_or_create(&self) -> Result<DataKey, StoreError> {
        let _guard = self.init_gate.lock().await;

        if let Some(stored) = self.medium.get(&self.slot)? {
            return self.import(&stored).await;
        }

        let key = self.crypto.generate_key().await.map_err(crypto_err)?;
        let exported = self.crypto.export_key(&key).await.map_err(crypto_err)?;
        let record = serde_json::to_string(&exported).map_err(|e| StoreError::Crypto {
            reason: format!("key export serialization: {e}"),
        })?;
        self.medium.set(&self.slot, record)?;
        debug!("generated new data key");
        Ok(key)
    }

    /// Load the stored key without ever creating one.
    pub async fn load(&self) -> Result<Option<DataKey>, StoreError> {
        match self.medium.get(&self.slot)? {
            Some(stored) => self.import(&stored).await.map(Some),
            None => Ok(None),
        }
    }

    /// Drop the key material. Anything encrypted under it becomes unreadable.
    pub async fn discard(&self) -> Result<(), StoreError> {
        let _guard = self.init_gate.lock().await;
        self.medium.remove(&self.slot)?;
        warn!(slot = %self.slot, "key material discarded");
        Ok(())
    }

    async fn import(&self, stored: &str) -> Result<DataKey, StoreError> {
        let exported: ExportedKey =
            serde_json::from_str(stored).map_err(|e| StoreError::CorruptKeyMaterial {
                reason: format!("unparsable key record: {e}"),
            })?;
        self.crypto
            .import_key(&exported)
            .await
            .map_err(|e| StoreError::CorruptKeyMaterial {
                reason: e.to_string(),
            })
    }
}

fn crypto_err(err: strongbox_core::CryptoError) -> StoreError {
    StoreError::Crypto {
        reason: err.to_string(),
    }
}

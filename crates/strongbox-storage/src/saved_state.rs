use std::{marker::PhantomData, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use strongbox_core::{CryptoProvider, StorageMedium, StoreError, WriteError};

use crate::encrypted_store::{EncryptedStore, MigrationOutcome};

/// Logical key of the saved application state.
pub const SAVED_STATE_KEY: &str = "app_state";

/// Typed accessor for the one entry holding saved application state
/// (session and balance snapshot).
pub struct SavedState<T, M, C> {
    store: Arc<EncryptedStore<M, C>>,
    key: String,
    _state: PhantomData<fn() -> T>,
}

impl<T, M, C> SavedState<T, M, C>
where
    T: Serialize + DeserializeOwned,
    M: StorageMedium,
    C: CryptoProvider,
{
    pub fn new(store: Arc<EncryptedStore<M, C>>) -> Self {
        Self::with_key(store, SAVED_STATE_KEY)
    }

    pub fn with_key(store: Arc<EncryptedStore<M, C>>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _state: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub async fn save(&self, state: &T) -> Result<(), WriteError> {
        self.store.set_item(&self.key, state).await
    }

    pub async fn load(&self) -> Option<T> {
        self.store.get_item(&self.key).await
    }

    pub fn exists(&self) -> bool {
        self.store.has_item(&self.key)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove_item(&self.key)
    }

    /// Upgrade a plaintext copy left under the same name by older builds.
    pub async fn migrate_legacy(&self) -> MigrationOutcome {
        self.store.migrate_legacy_data(&self.key).await
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;
    use strongbox_core::InMemoryMedium;

    use super::*;
    use crate::aes_gcm_provider::AesGcmProvider;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct AppState {
        address: String,
        balance: String,
        connected: bool,
    }

    fn accessor(medium: &InMemoryMedium) -> SavedState<AppState, InMemoryMedium, AesGcmProvider> {
        let store = EncryptedStore::new(medium.clone(), AesGcmProvider::new());
        SavedState::new(Arc::new(store))
    }

    fn sample() -> AppState {
        AppState {
            address: "0x1234".into(),
            balance: "0.75".into(),
            connected: true,
        }
    }

    #[tokio::test]
    async fn save_load_clear() {
        let medium = InMemoryMedium::new();
        let state = accessor(&medium);

        assert_eq!(state.load().await, None);
        state.save(&sample()).await.expect("save");
        assert!(state.exists());
        assert_eq!(state.load().await, Some(sample()));
        assert!(medium.get("secure_app_state").unwrap().is_some());

        state.clear().expect("clear");
        assert!(!state.exists());
        assert_eq!(state.load().await, None);
    }

    #[tokio::test]
    async fn migrates_legacy_plaintext_state() {
        let medium = InMemoryMedium::new();
        medium
            .set(
                SAVED_STATE_KEY,
                json!({"address": "0x1234", "balance": "0.75", "connected": true}).to_string(),
            )
            .unwrap();
        let state = accessor(&medium);

        assert_eq!(state.migrate_legacy().await, MigrationOutcome::Migrated);
        assert_eq!(state.load().await, Some(sample()));
        assert_eq!(medium.get(SAVED_STATE_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn incompatible_shape_loads_as_absent() {
        let medium = InMemoryMedium::new();
        let store = Arc::new(EncryptedStore::new(medium.clone(), AesGcmProvider::new()));
        store
            .set_item(SAVED_STATE_KEY, &json!({"unexpected": 1}))
            .await
            .expect("set");

        let state: SavedState<AppState, _, _> = SavedState::new(store);
        assert_eq!(state.load().await, None);
    }
}

//! Envelope codec: value -> canonical JSON bytes -> AES-GCM ciphertext -> base64 record,
//! and back.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strongbox_core::{CryptoProvider, DataKey, DecryptionError, StoreError, NONCE_LEN};

/// Persisted unit for one logical entry. Both fields are standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub nonce: String,
    /// Ciphertext with the GCM tag appended.
    pub ciphertext: String,
}

impl Envelope {
    /// Text stored in the medium.
    pub fn to_record(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| StoreError::StorageWrite {
            reason: format!("envelope serialization: {e}"),
        })
    }

    pub fn from_record(record: &str) -> Result<Self, DecryptionError> {
        serde_json::from_str(record).map_err(|_| DecryptionError)
    }
}

pub struct EnvelopeCodec<C> {
    crypto: Arc<C>,
}

impl<C: CryptoProvider> EnvelopeCodec<C> {
    pub fn new(crypto: Arc<C>) -> Self {
        Self { crypto }
    }

    /// Canonical serialization. Runs before any key or medium access on the write path.
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|e| StoreError::NotSerializable {
            reason: e.to_string(),
        })
    }

    /// Encrypt already-serialized bytes under a fresh nonce.
    pub async fn seal(&self, key: &DataKey, plaintext: &[u8]) -> Result<Envelope, StoreError> {
        let nonce = self.crypto.random_nonce();
        let ciphertext = self
            .crypto
            .encrypt(key, &nonce, plaintext)
            .await
            .map_err(|e| StoreError::Crypto {
                reason: e.to_string(),
            })?;

        Ok(Envelope {
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
        })
    }

    pub async fn encode<T: Serialize + ?Sized>(
        &self,
        key: &DataKey,
        value: &T,
    ) -> Result<Envelope, StoreError> {
        let plaintext = Self::serialize(value)?;
        self.seal(key, &plaintext).await
    }

    /// Every failure collapses into [`DecryptionError`].
    pub async fn decode<T: DeserializeOwned>(
        &self,
        key: &DataKey,
        envelope: &Envelope,
    ) -> Result<T, DecryptionError> {
        let nonce: [u8; NONCE_LEN] = STANDARD
            .decode(&envelope.nonce)
            .map_err(|_| DecryptionError)?
            .try_into()
            .map_err(|_| DecryptionError)?;
        let ciphertext = STANDARD
            .decode(&envelope.ciphertext)
            .map_err(|_| DecryptionError)?;

        let plaintext = self
            .crypto
            .decrypt(key, &nonce, &ciphertext)
            .await
            .map_err(|_| DecryptionError)?;
        serde_json::from_slice(&plaintext).map_err(|_| DecryptionError)
    }
}

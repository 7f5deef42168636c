use async_trait::async_trait;
use strongbox_core::{CryptoError, CryptoProvider, DataKey, ExportedKey, NONCE_LEN};

use crate::aes_gcm_provider::AesGcmProvider;

/// AES-GCM provider that hands control back to the scheduler before key generation and
/// encryption, so interleavings that a synchronous provider hides actually happen.
#[derive(Debug, Default, Clone, Copy)]
pub struct YieldingProvider {
    inner: AesGcmProvider,
}

impl YieldingProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

async fn yield_times(n: usize) {
    for _ in 0..n {
        tokio::task::yield_now().await;
    }
}

#[async_trait]
impl CryptoProvider for YieldingProvider {
    async fn generate_key(&self) -> Result<DataKey, CryptoError> {
        yield_times(4).await;
        self.inner.generate_key().await
    }

    async fn export_key(&self, key: &DataKey) -> Result<ExportedKey, CryptoError> {
        self.inner.export_key(key).await
    }

    async fn import_key(&self, exported: &ExportedKey) -> Result<DataKey, CryptoError> {
        self.inner.import_key(exported).await
    }

    async fn encrypt(
        &self,
        key: &DataKey,
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        yield_times(4).await;
        self.inner.encrypt(key, nonce, plaintext).await
    }

    async fn decrypt(
        &self,
        key: &DataKey,
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.inner.decrypt(key, nonce, ciphertext).await
    }

    fn random_nonce(&self) -> [u8; NONCE_LEN] {
        self.inner.random_nonce()
    }
}

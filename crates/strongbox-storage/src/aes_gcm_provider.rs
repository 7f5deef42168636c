use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use strongbox_core::{CryptoError, CryptoProvider, DataKey, ExportedKey, KEY_LEN, NONCE_LEN};
use zeroize::Zeroizing;

const JWK_KTY: &str = "oct";
const JWK_ALG: &str = "A256GCM";

/// AES-256-GCM provider backed by the OS random source.
#[derive(Debug, Default, Clone, Copy)]
pub struct AesGcmProvider;

impl AesGcmProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CryptoProvider for AesGcmProvider {
    async fn generate_key(&self) -> Result<DataKey, CryptoError> {
        let mut bytes = [0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Ok(DataKey::from_bytes(bytes))
    }

    async fn export_key(&self, key: &DataKey) -> Result<ExportedKey, CryptoError> {
        Ok(ExportedKey {
            kty: JWK_KTY.to_string(),
            k: URL_SAFE_NO_PAD.encode(key.expose()),
            alg: JWK_ALG.to_string(),
            ext: true,
            key_ops: vec!["encrypt".to_string(), "decrypt".to_string()],
        })
    }

    async fn import_key(&self, exported: &ExportedKey) -> Result<DataKey, CryptoError> {
        if exported.kty != JWK_KTY {
            return Err(CryptoError::InvalidKey(format!(
                "unsupported key type {}",
                exported.kty
            )));
        }
        if exported.alg != JWK_ALG {
            return Err(CryptoError::InvalidKey(format!(
                "unsupported algorithm {}",
                exported.alg
            )));
        }

        // Browsers emit unpadded base64url, tolerate trailing padding anyway.
        let decoded = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(exported.k.trim_end_matches('='))
                .map_err(|e| CryptoError::InvalidKey(e.to_string()))?,
        );
        if decoded.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                decoded.len()
            )));
        }
        let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
        bytes.copy_from_slice(&decoded);
        Ok(DataKey::from_bytes(*bytes))
    }

    async fn encrypt(
        &self,
        key: &DataKey,
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        build_cipher(key)?
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|e| CryptoError::Encrypt(e.to_string()))
    }

    async fn decrypt(
        &self,
        key: &DataKey,
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        build_cipher(key)?
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Decrypt)
    }

    fn random_nonce(&self) -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }
}

fn build_cipher(key: &DataKey) -> Result<Aes256Gcm, CryptoError> {
    Aes256Gcm::new_from_slice(key.expose()).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn export_then_import_yields_same_key() {
        let provider = AesGcmProvider::new();
        let key = provider.generate_key().await.expect("generate");
        let exported = provider.export_key(&key).await.expect("export");

        assert_eq!(exported.kty, "oct");
        assert_eq!(exported.alg, "A256GCM");
        assert!(!exported.k.contains('='));

        let imported = provider.import_key(&exported).await.expect("import");
        assert_eq!(imported, key);
    }

    #[tokio::test]
    async fn import_rejects_wrong_length() {
        let provider = AesGcmProvider::new();
        let exported = ExportedKey {
            kty: "oct".into(),
            k: URL_SAFE_NO_PAD.encode([1u8; 16]),
            alg: "A256GCM".into(),
            ext: true,
            key_ops: vec![],
        };
        let err = provider
            .import_key(&exported)
            .await
            .expect_err("should reject 128-bit key");
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn import_accepts_padded_and_rejects_oversized_keys() {
        let provider = AesGcmProvider::new();
        let key = provider.generate_key().await.expect("generate");
        let mut exported = provider.export_key(&key).await.expect("export");
        exported.k.push('=');
        assert_eq!(provider.import_key(&exported).await.expect("padded"), key);

        exported.k = URL_SAFE_NO_PAD.encode([7u8; 48]);
        let err = provider.import_key(&exported).await.expect_err("384-bit key");
        assert_eq!(
            err,
            CryptoError::InvalidKey("expected 32 bytes, got 48".to_string())
        );
    }

    #[tokio::test]
    async fn import_rejects_foreign_algorithm() {
        let provider = AesGcmProvider::new();
        let key = provider.generate_key().await.expect("generate");
        let mut exported = provider.export_key(&key).await.expect("export");
        exported.alg = "A128CBC".into();

        let err = provider.import_key(&exported).await.expect_err("bad alg");
        assert!(matches!(err, CryptoError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn ciphertext_carries_tag_and_detects_tampering() {
        let provider = AesGcmProvider::new();
        let key = provider.generate_key().await.expect("generate");
        let nonce = provider.random_nonce();

        let mut ciphertext = provider
            .encrypt(&key, &nonce, b"balance=42")
            .await
            .expect("encrypt");
        assert_eq!(ciphertext.len(), b"balance=42".len() + 16);

        let plain = provider
            .decrypt(&key, &nonce, &ciphertext)
            .await
            .expect("decrypt");
        assert_eq!(plain, b"balance=42");

        ciphertext[0] ^= 0x01;
        let err = provider
            .decrypt(&key, &nonce, &ciphertext)
            .await
            .expect_err("tampered ciphertext must fail");
        assert_eq!(err, CryptoError::Decrypt);
    }

    #[test]
    fn nonces_differ_between_calls() {
        let provider = AesGcmProvider::new();
        assert_ne!(provider.random_nonce(), provider.random_nonce());
    }
}

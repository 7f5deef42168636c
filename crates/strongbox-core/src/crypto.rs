use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Key length for AES-256-GCM.
pub const KEY_LEN: usize = 32;
/// Nonce length for AES-GCM (96 bits).
pub const NONCE_LEN: usize = 12;

/// Symmetric data key. Bytes are wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DataKey {
    bytes: [u8; KEY_LEN],
}

impl DataKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn expose(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataKey(<redacted>)")
    }
}

/// Transportable key representation, shaped as a JSON Web Key so a browser's
/// `crypto.subtle.exportKey("jwk", ..)` output round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedKey {
    pub kty: String,
    /// Base64url (no padding) key bytes.
    pub k: String,
    pub alg: String,
    #[serde(default = "default_ext")]
    pub ext: bool,
    #[serde(default)]
    pub key_ops: Vec<String>,
}

fn default_ext() -> bool {
    true
}

/// Authenticated-encryption primitives the store is built on.
#[async_trait]
pub trait CryptoProvider: Send + Sync {
    /// Generate a fresh 256-bit key from a secure source.
    async fn generate_key(&self) -> Result<DataKey, CryptoError>;

    async fn export_key(&self, key: &DataKey) -> Result<ExportedKey, CryptoError>;

    async fn import_key(&self, exported: &ExportedKey) -> Result<DataKey, CryptoError>;

    /// Encrypt; the returned ciphertext carries the authentication tag.
    async fn encrypt(
        &self,
        key: &DataKey,
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Decrypt and verify the tag.
    async fn decrypt(
        &self,
        key: &DataKey,
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Fresh random nonce; never reused across calls.
    fn random_nonce(&self) -> [u8; NONCE_LEN];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_key_bytes() {
        let key = DataKey::from_bytes([7u8; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "DataKey(<redacted>)");
    }

    #[test]
    fn exported_key_parses_browser_jwk() {
        let jwk = r#"{"alg":"A256GCM","ext":true,"k":"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA","key_ops":["encrypt","decrypt"],"kty":"oct"}"#;
        let parsed: ExportedKey = serde_json::from_str(jwk).expect("parse jwk");
        assert_eq!(parsed.kty, "oct");
        assert_eq!(parsed.alg, "A256GCM");
        assert_eq!(parsed.key_ops, vec!["encrypt", "decrypt"]);
    }

    #[test]
    fn exported_key_defaults_optional_fields() {
        let parsed: ExportedKey =
            serde_json::from_str(r#"{"kty":"oct","k":"abc","alg":"A256GCM"}"#).expect("parse");
        assert!(parsed.ext);
        assert!(parsed.key_ops.is_empty());
    }
}

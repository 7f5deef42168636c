use thiserror::Error;

/// Raw failures reported by a [`StorageMedium`](crate::medium::StorageMedium).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediumError {
    #[error("read failed for slot {slot}: {reason}")]
    Read { slot: String, reason: String },
    #[error("write failed for slot {slot}: {reason}")]
    Write { slot: String, reason: String },
    /// The medium's own capacity ceiling was hit.
    #[error("quota exceeded writing slot {slot} ({needed} bytes needed, {available} available)")]
    QuotaExceeded {
        slot: String,
        needed: usize,
        available: usize,
    },
}

/// Errors produced by the encrypted store and its key lifecycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Value has no canonical JSON form. Raised before any key or medium access.
    #[error("value is not serializable: {reason}")]
    NotSerializable { reason: String },
    #[error("storage read failed: {reason}")]
    StorageRead { reason: String },
    #[error("storage write failed: {reason}")]
    StorageWrite { reason: String },
    /// Key slot is populated but cannot be parsed or imported. Requires an explicit reset.
    #[error("stored key material is corrupt: {reason}")]
    CorruptKeyMaterial { reason: String },
    #[error("crypto failure: {reason}")]
    Crypto { reason: String },
    #[error("invalid store configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<MediumError> for StoreError {
    fn from(err: MediumError) -> Self {
        match err {
            MediumError::Read { .. } => StoreError::StorageRead {
                reason: err.to_string(),
            },
            MediumError::Write { .. } | MediumError::QuotaExceeded { .. } => {
                StoreError::StorageWrite {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// An envelope could not be turned back into a value.
///
/// Carries no detail on purpose: malformed encoding, a failed tag check and bad JSON all
/// look the same to the caller.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("envelope is unreadable")]
pub struct DecryptionError;

/// The single failure surfaced by a write: the value was not persisted.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to persist entry {key}")]
pub struct WriteError {
    pub key: String,
    #[source]
    pub source: StoreError,
}

impl WriteError {
    pub fn new(key: impl Into<String>, source: StoreError) -> Self {
        Self {
            key: key.into(),
            source,
        }
    }
}

/// Failures from a [`CryptoProvider`](crate::crypto::CryptoProvider).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("encrypt failed: {0}")]
    Encrypt(String),
    #[error("decrypt failed")]
    Decrypt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_errors_map_to_storage_write() {
        let err: StoreError = MediumError::QuotaExceeded {
            slot: "secure_a".into(),
            needed: 10,
            available: 2,
        }
        .into();
        assert!(matches!(err, StoreError::StorageWrite { .. }));
    }

    #[test]
    fn write_error_exposes_cause() {
        let err = WriteError::new(
            "balance",
            StoreError::NotSerializable {
                reason: "key must be a string".into(),
            },
        );
        let source = std::error::Error::source(&err).expect("source");
        assert!(source.to_string().contains("not serializable"));
    }
}

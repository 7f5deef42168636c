//! Core contracts for strongbox: the storage medium, the crypto provider and the
//! error taxonomy shared by every store implementation.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod crypto;
pub mod error;
pub mod medium;

pub use crypto::{CryptoProvider, DataKey, ExportedKey, KEY_LEN, NONCE_LEN};
pub use error::{CryptoError, DecryptionError, MediumError, StoreError, WriteError};
pub use medium::{InMemoryMedium, StorageMedium};

//! Encrypted key-value storage over untrusted media.
//! AES-256-GCM envelopes, with the data key persisted as a JWK next to the data.

pub mod aes_gcm_provider;
pub mod encrypted_store;
pub mod envelope;
pub mod file_medium;
pub mod key_provider;
pub mod saved_state;
#[cfg(test)]
mod test_support;

pub use aes_gcm_provider::AesGcmProvider;
pub use encrypted_store::{EncryptedStore, MigrationOutcome, StoreConfig, DEFAULT_PREFIX};
pub use envelope::{Envelope, EnvelopeCodec};
pub use file_medium::FileMedium;
pub use key_provider::{KeyManager, DEFAULT_KEY_SLOT};
pub use saved_state::{SavedState, SAVED_STATE_KEY};

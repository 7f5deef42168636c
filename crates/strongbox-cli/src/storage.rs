use std::path::PathBuf;

use crate::config::Config;
use color_eyre::Result;
use dirs::data_dir;
use strongbox_storage::{AesGcmProvider, EncryptedStore, FileMedium};
use tracing::debug;

pub type Store = EncryptedStore<FileMedium, AesGcmProvider>;

/// Resolve the default data directory for strongbox.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("strongbox"))
}

/// Build the file-backed store, honoring config overrides.
pub fn store_from_config(config: &Config) -> Result<Store> {
    let root = match &config.data_dir {
        Some(root) => root.clone(),
        None => default_data_dir()?,
    };
    debug!(?root, "opening encrypted store");
    open(root, config)
}

fn open(root: PathBuf, config: &Config) -> Result<Store> {
    Ok(EncryptedStore::with_config(
        FileMedium::new(root),
        AesGcmProvider::new(),
        config.store_config(),
    )?)
}

/// Helper for tests to construct a store rooted at a temp dir.
#[cfg(test)]
pub fn test_store(root: impl Into<PathBuf>) -> Store {
    open(root.into(), &Config::default()).expect("default config is valid")
}

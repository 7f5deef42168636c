use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use strongbox_core::{MediumError, StorageMedium};
use tempfile::NamedTempFile;
use tracing::instrument;

/// Suffix marking files that hold a slot.
const SLOT_EXT: &str = ".slot";
/// Longest file name most filesystems accept.
pub const MAX_FILE_NAME: usize = 255;

/// Directory-backed medium: one file per slot, named by the base64url of the slot plus
/// a `.slot` suffix. Writes land in a temp file first and are renamed into place, so a reader
/// sees either the old or the new value.
///
/// The directory should belong to the medium. A foreign file that happens to carry the
/// suffix and a decodable name is listed as a slot. Slots whose file name would exceed
/// [`MAX_FILE_NAME`] bytes (187 bytes of slot text) are rejected on write.
#[derive(Debug, Clone)]
pub struct FileMedium {
    root: PathBuf,
}

impl FileMedium {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `None` when the slot cannot be represented as a file name.
    fn path_for(&self, slot: &str) -> Option<PathBuf> {
        let name = format!("{}{SLOT_EXT}", URL_SAFE_NO_PAD.encode(slot));
        (name.len() <= MAX_FILE_NAME).then(|| self.root.join(name))
    }
}

impl StorageMedium for FileMedium {
    fn get(&self, slot: &str) -> Result<Option<String>, MediumError> {
        // Could never have been written.
        let Some(path) = self.path_for(slot) else {
            return Ok(None);
        };
        match fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(read_err(slot, err)),
        }
    }

    #[instrument(skip_all, fields(slot = %slot))]
    fn set(&self, slot: &str, value: String) -> Result<(), MediumError> {
        let path = self.path_for(slot).ok_or_else(|| MediumError::Write {
            slot: slot.to_string(),
            reason: format!(
                "slot name too long for a file name (limit {MAX_FILE_NAME} bytes encoded)"
            ),
        })?;
        fs::create_dir_all(&self.root).map_err(|e| write_err(slot, e))?;

        let mut tmp = NamedTempFile::new_in(&self.root).map_err(|e| write_err(slot, e))?;
        tmp.write_all(value.as_bytes())
            .map_err(|e| write_err(slot, e))?;
        tmp.flush().map_err(|e| write_err(slot, e))?;
        tmp.persist(path)
            .map_err(|e| write_err(slot, e.error))?;
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), MediumError> {
        let Some(path) = self.path_for(slot) else {
            return Ok(());
        };
        match fs::remove_file(path) {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(write_err(slot, err)),
        }
    }

    fn keys(&self) -> Result<Vec<String>, MediumError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(read_err("*", err)),
        };

        let mut slots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| read_err("*", e))?;
            if !entry.file_type().map_err(|e| read_err("*", e))?.is_file() {
                continue;
            }
            // Leftover temp files and foreign files lack the suffix or do not decode.
            let decoded = entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_suffix(SLOT_EXT))
                .and_then(|name| URL_SAFE_NO_PAD.decode(name).ok())
                .and_then(|bytes| String::from_utf8(bytes).ok());
            if let Some(slot) = decoded {
                slots.push(slot);
            }
        }
        slots.sort();
        Ok(slots)
    }
}

fn read_err(slot: &str, err: std::io::Error) -> MediumError {
    MediumError::Read {
        slot: slot.to_string(),
        reason: err.to_string(),
    }
}

fn write_err(slot: &str, err: std::io::Error) -> MediumError {
    MediumError::Write {
        slot: slot.to_string(),
        reason: err.to_string(),
    }
}

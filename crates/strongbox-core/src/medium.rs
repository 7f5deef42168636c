use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use crate::error::MediumError;

/// Persistent key -> string mapping the store writes into (browser local storage,
/// a directory on disk, ...). Operations are synchronous and each `set` is atomic.
pub trait StorageMedium: Send + Sync {
    /// Read a slot; `Ok(None)` when the slot does not exist.
    fn get(&self, slot: &str) -> Result<Option<String>, MediumError>;

    /// Write a slot, replacing any previous value.
    fn set(&self, slot: &str, value: String) -> Result<(), MediumError>;

    /// Remove a slot (idempotent).
    fn remove(&self, slot: &str) -> Result<(), MediumError>;

    /// Enumerate every slot currently present.
    fn keys(&self) -> Result<Vec<String>, MediumError>;

    fn contains(&self, slot: &str) -> Result<bool, MediumError> {
        Ok(self.get(slot)?.is_some())
    }
}

/// In-memory medium for tests and ephemeral sessions.
///
/// An optional quota caps the total size (slot names plus values, in bytes), which is how
/// browser storage behaves once its ceiling is reached.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMedium {
    inner: Arc<Mutex<BTreeMap<String, String>>>,
    quota: Option<usize>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(max_bytes: usize) -> Self {
        Self {
            quota: Some(max_bytes),
            ..Self::default()
        }
    }

    /// Number of successful `set` calls performed so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of every slot, for assertions.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner
            .lock()
            .map(|map| map.clone())
            .unwrap_or_default()
    }

    fn lock(
        &self,
        slot: &str,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>, MediumError> {
        self.inner.lock().map_err(|err| MediumError::Read {
            slot: slot.to_string(),
            reason: format!("lock poisoned: {err}"),
        })
    }
}

impl StorageMedium for InMemoryMedium {
    fn get(&self, slot: &str) -> Result<Option<String>, MediumError> {
        Ok(self.lock(slot)?.get(slot).cloned())
    }

    fn set(&self, slot: &str, value: String) -> Result<(), MediumError> {
        let mut map = self.inner.lock().map_err(|err| MediumError::Write {
            slot: slot.to_string(),
            reason: format!("lock poisoned: {err}"),
        })?;

        if let Some(quota) = self.quota {
            let used: usize = map
                .iter()
                .filter(|(k, _)| k.as_str() != slot)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = slot.len() + value.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(MediumError::QuotaExceeded {
                    slot: slot.to_string(),
                    needed,
                    available,
                });
            }
        }

        map.insert(slot.to_string(), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove(&self, slot: &str) -> Result<(), MediumError> {
        let mut map = self.inner.lock().map_err(|err| MediumError::Write {
            slot: slot.to_string(),
            reason: format!("lock poisoned: {err}"),
        })?;
        map.remove(slot);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, MediumError> {
        Ok(self.lock("*")?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_and_overwrite() {
        let medium = InMemoryMedium::new();
        medium.set("a", "1".into()).expect("set");
        medium.set("a", "2".into()).expect("overwrite");

        assert_eq!(medium.get("a").expect("get").as_deref(), Some("2"));
        assert_eq!(medium.writes(), 2);
        assert!(medium.contains("a").expect("contains"));
        assert!(!medium.contains("b").expect("contains"));
    }

    #[test]
    fn remove_is_idempotent() {
        let medium = InMemoryMedium::new();
        medium.set("k", "v".into()).expect("set");
        medium.remove("k").expect("remove");
        medium.remove("k").expect("remove again");

        assert_eq!(medium.get("k").expect("get"), None);
        assert!(medium.keys().expect("keys").is_empty());
    }

    #[test]
    fn quota_rejects_oversized_write_and_keeps_state() {
        let medium = InMemoryMedium::with_quota(8);
        medium.set("ab", "cd".into()).expect("fits");

        let err = medium
            .set("xyz", "0123456".into())
            .expect_err("should exceed quota");
        assert!(matches!(err, MediumError::QuotaExceeded { .. }));
        assert_eq!(medium.keys().expect("keys"), vec!["ab".to_string()]);
        assert_eq!(medium.writes(), 1);
    }

    #[test]
    fn quota_allows_replacing_existing_slot() {
        let medium = InMemoryMedium::with_quota(6);
        medium.set("ab", "cdef".into()).expect("fits exactly");
        medium.set("ab", "wxyz".into()).expect("replacement does not double count");
    }

    #[test]
    fn clones_share_state() {
        let medium = InMemoryMedium::new();
        let view = medium.clone();
        medium.set("shared", "yes".into()).expect("set");
        assert_eq!(view.get("shared").expect("get").as_deref(), Some("yes"));
    }
}

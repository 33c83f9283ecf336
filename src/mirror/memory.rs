use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::types::{MirrorStore, PatientDocument};
use super::MirrorError;

/// In-memory mirror store for testing.
///
/// Can be switched offline to exercise the relay's retry path.
pub struct InMemoryMirrorStore {
    documents: Mutex<BTreeMap<i64, PatientDocument>>,
    offline: AtomicBool,
}

impl InMemoryMirrorStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(BTreeMap::new()),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn documents(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<i64, PatientDocument>>, MirrorError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(MirrorError::Unavailable("in-memory mirror is offline".into()));
        }
        self.documents
            .lock()
            .map_err(|_| MirrorError::Unavailable("mirror lock poisoned".into()))
    }
}

impl Default for InMemoryMirrorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MirrorStore for InMemoryMirrorStore {
    fn upsert(&self, doc: &PatientDocument) -> Result<(), MirrorError> {
        self.documents()?.insert(doc.sql_id, doc.clone());
        Ok(())
    }

    fn delete_by_sql_id(&self, sql_id: i64) -> Result<bool, MirrorError> {
        Ok(self.documents()?.remove(&sql_id).is_some())
    }

    fn get_by_sql_id(&self, sql_id: i64) -> Result<Option<PatientDocument>, MirrorError> {
        Ok(self.documents()?.get(&sql_id).cloned())
    }

    fn count(&self) -> Result<u64, MirrorError> {
        Ok(self.documents()?.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_patient;

    #[test]
    fn store_and_count() {
        let store = InMemoryMirrorStore::new();
        store.upsert(&PatientDocument::from(&sample_patient(1))).unwrap();
        store.upsert(&PatientDocument::from(&sample_patient(2))).unwrap();
        store.upsert(&PatientDocument::from(&sample_patient(1))).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn offline_store_rejects_writes() {
        let store = InMemoryMirrorStore::new();
        store.set_offline(true);
        assert!(store.upsert(&PatientDocument::from(&sample_patient(1))).is_err());
        store.set_offline(false);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn delete_reports_presence() {
        let store = InMemoryMirrorStore::new();
        assert!(!store.delete_by_sql_id(5).unwrap());
        store.upsert(&PatientDocument::from(&sample_patient(5))).unwrap();
        assert!(store.delete_by_sql_id(5).unwrap());
    }
}

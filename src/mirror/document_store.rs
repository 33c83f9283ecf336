use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection};

use super::types::{MirrorStore, PatientDocument};
use super::MirrorError;
use crate::db::mirror_db::open_mirror_database;

/// SQLite-backed document collection (`mirror.db`, collection `patients`).
///
/// Opens its own connection per operation so it can be shared across
/// request handlers and the relay task.
pub struct SqliteDocumentStore {
    db_path: PathBuf,
}

impl SqliteDocumentStore {
    pub fn new(db_path: &Path) -> Self {
        Self {
            db_path: db_path.to_path_buf(),
        }
    }

    fn open(&self) -> Result<Connection, MirrorError> {
        Ok(open_mirror_database(&self.db_path)?)
    }
}

impl MirrorStore for SqliteDocumentStore {
    fn upsert(&self, doc: &PatientDocument) -> Result<(), MirrorError> {
        let body = serde_json::to_string(doc)?;
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO patients (sql_id, body, mirrored_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(sql_id) DO UPDATE SET body = excluded.body, mirrored_at = excluded.mirrored_at",
            params![doc.sql_id, body, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete_by_sql_id(&self, sql_id: i64) -> Result<bool, MirrorError> {
        let conn = self.open()?;
        let deleted = conn.execute("DELETE FROM patients WHERE sql_id = ?1", params![sql_id])?;
        Ok(deleted > 0)
    }

    fn get_by_sql_id(&self, sql_id: i64) -> Result<Option<PatientDocument>, MirrorError> {
        let conn = self.open()?;
        let result = conn.query_row(
            "SELECT body FROM patients WHERE sql_id = ?1",
            params![sql_id],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(body) => Ok(Some(serde_json::from_str(&body)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn count(&self) -> Result<u64, MirrorError> {
        let conn = self.open()?;
        let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StrokeLabel;
    use crate::test_support::sample_patient;

    fn store() -> (tempfile::TempDir, SqliteDocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteDocumentStore::new(&dir.path().join("mirror.db"));
        (dir, store)
    }

    #[test]
    fn upsert_then_get() {
        let (_dir, store) = store();
        let doc = PatientDocument::from(&sample_patient(1));
        store.upsert(&doc).unwrap();
        assert_eq!(store.get_by_sql_id(1).unwrap(), Some(doc));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn upsert_replaces_existing_document() {
        let (_dir, store) = store();
        let mut doc = PatientDocument::from(&sample_patient(1));
        store.upsert(&doc).unwrap();

        doc.stroke = StrokeLabel::Stroke;
        doc.bmi = None;
        store.upsert(&doc).unwrap();

        let stored = store.get_by_sql_id(1).unwrap().unwrap();
        assert_eq!(stored.stroke, StrokeLabel::Stroke);
        assert_eq!(stored.bmi, None);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn delete_missing_is_noop() {
        let (_dir, store) = store();
        assert!(!store.delete_by_sql_id(99).unwrap());

        store.upsert(&PatientDocument::from(&sample_patient(99))).unwrap();
        assert!(store.delete_by_sql_id(99).unwrap());
        assert!(store.get_by_sql_id(99).unwrap().is_none());
    }
}

//! Mirror database: the document-oriented read replica of the patient table.
//!
//! Stored in its own SQLite file (`mirror.db`) with a separate migration
//! chain. Each row of the `patients` collection is one JSON document keyed by
//! the record store's id (`sql_id`). Nothing here is authoritative: the
//! mirror may lag or be rebuilt from the record store at any time.

use std::path::Path;

use rusqlite::Connection;

use super::sqlite::{apply_migrations, configure_pragmas};
use super::DatabaseError;

/// Open (or create) the mirror database and run migrations.
pub fn open_mirror_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_mirror_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory mirror database (for testing).
pub fn open_memory_mirror_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_mirror_migrations(&conn)?;
    Ok(conn)
}

fn run_mirror_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let migrations: Vec<(i64, &str)> = vec![(
        1,
        include_str!("../../resources/mirror_migrations/001_patient_documents.sql"),
    )];
    apply_migrations(conn, &migrations, "mirror")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::count_tables;

    #[test]
    fn mirror_database_initializes_all_tables() {
        let conn = open_memory_mirror_database().unwrap();
        // schema_version + patients
        assert_eq!(count_tables(&conn).unwrap(), 2);
    }

    #[test]
    fn mirror_migration_idempotent() {
        let conn = open_memory_mirror_database().unwrap();
        assert!(run_mirror_migrations(&conn).is_ok());
    }

    #[test]
    fn body_must_be_json() {
        let conn = open_memory_mirror_database().unwrap();
        let result = conn.execute(
            "INSERT INTO patients (sql_id, body, mirrored_at) VALUES (1, 'not json', '2024-01-01')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn mirror_database_opens_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mirror.db");
        let conn = open_mirror_database(&path).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 2);
        drop(conn);
        let conn2 = open_mirror_database(&path).unwrap();
        assert_eq!(count_tables(&conn2).unwrap(), 2);
    }
}

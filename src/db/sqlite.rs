use std::path::Path;

use rusqlite::Connection;

use super::DatabaseError;

/// Open the record store at the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

/// Open an in-memory record store (for testing)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&conn)?;
    Ok(conn)
}

pub(crate) fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL;
         PRAGMA busy_timeout=5000;
         PRAGMA foreign_keys=ON;",
    )?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    let migrations: Vec<(i64, &str)> = vec![
        (1, include_str!("../../resources/migrations/001_initial.sql")),
        (2, include_str!("../../resources/migrations/002_mirror_outbox.sql")),
        (3, include_str!("../../resources/migrations/003_mirror_outbox_parking.sql")),
    ];
    apply_migrations(conn, &migrations, "records")
}

/// Apply every migration newer than the recorded schema version.
pub(crate) fn apply_migrations(
    conn: &Connection,
    migrations: &[(i64, &str)],
    chain: &str,
) -> Result<(), DatabaseError> {
    let current_version = get_current_version(conn);

    for &(version, sql) in migrations {
        if version > current_version {
            tracing::info!(chain, "Running migration v{version}");
            conn.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
                version,
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Get the current schema version (0 if no schema exists yet)
fn get_current_version(conn: &Connection) -> i64 {
    conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get::<_, Option<i64>>(0),
    )
    .ok()
    .flatten()
    .unwrap_or(0)
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_initializes_all_tables() {
        let conn = open_memory_database().unwrap();
        // schema_version + users + patients + mirror_outbox
        let count = count_tables(&conn).unwrap();
        assert_eq!(count, 4, "Expected 4 tables, got {count}");
    }

    #[test]
    fn schema_version_is_current() {
        let conn = open_memory_database().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 3);
    }

    #[test]
    fn migration_idempotent() {
        let conn = open_memory_database().unwrap();
        let result = run_migrations(&conn);
        assert!(result.is_ok());
    }

    #[test]
    fn opens_from_disk_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let conn = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn).unwrap(), 4);
        drop(conn);

        let conn2 = open_database(&path).unwrap();
        assert_eq!(count_tables(&conn2).unwrap(), 4);
    }

    #[test]
    fn patient_checks_reject_bad_choices() {
        let conn = open_memory_database().unwrap();
        let result = conn.execute(
            "INSERT INTO patients (gender, age, ever_married, work_type, residence_type, avg_glucose_level)
             VALUES ('Robot', 40, 'Yes', 'Private', 'Urban', 100)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn stroke_column_accepts_null_zero_one_only() {
        let conn = open_memory_database().unwrap();
        for (stroke, ok) in [("NULL", true), ("0", true), ("1", true), ("2", false)] {
            let result = conn.execute(
                &format!(
                    "INSERT INTO patients (gender, age, ever_married, work_type, residence_type, avg_glucose_level, stroke)
                     VALUES ('Male', 40, 'Yes', 'Private', 'Urban', 100, {stroke})"
                ),
                [],
            );
            assert_eq!(result.is_ok(), ok, "stroke={stroke}");
        }
    }
}

use rusqlite::{params, Connection};

use super::parse_timestamp;
use crate::db::DatabaseError;
use crate::models::User;

pub fn insert_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
        params![username, password_hash],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user_by_username(
    conn: &Connection,
    username: &str,
) -> Result<Option<User>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1",
        params![username],
        |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        },
    );

    match result {
        Ok((id, username, password_hash, created_at)) => Ok(Some(User {
            id,
            username,
            password_hash,
            created_at: parse_timestamp(&created_at)?,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn count_users(conn: &Connection) -> Result<u64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get::<_, i64>(0))?;
    Ok(count as u64)
}

use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};

use super::parse_timestamp;
use crate::db::DatabaseError;
use crate::models::enums::MirrorOp;

/// A pending change for the mirror store, recorded alongside the
/// record-store write that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorEvent {
    pub id: i64,
    pub sql_id: i64,
    pub op: MirrorOp,
    /// Serialized document for upserts, `None` for deletes.
    pub payload: Option<String>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: NaiveDateTime,
}

pub fn enqueue_mirror_event(
    conn: &Connection,
    sql_id: i64,
    op: MirrorOp,
    payload: Option<&str>,
) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO mirror_outbox (sql_id, op, payload) VALUES (?1, ?2, ?3)",
        params![sql_id, op.as_str(), payload],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Oldest pending events first.
pub fn pending_mirror_events(
    conn: &Connection,
    limit: usize,
) -> Result<Vec<MirrorEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, sql_id, op, payload, attempts, last_error, created_at
         FROM mirror_outbox WHERE parked_at IS NULL ORDER BY id ASC LIMIT ?1",
    )?;
    let rows = stmt.query_map(params![limit as i64], read_row)?;
    collect_events(rows)
}

/// Pending events for one correlated row, oldest first.
pub fn pending_mirror_events_for(
    conn: &Connection,
    sql_id: i64,
) -> Result<Vec<MirrorEvent>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, sql_id, op, payload, attempts, last_error, created_at
         FROM mirror_outbox WHERE sql_id = ?1 AND parked_at IS NULL ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![sql_id], read_row)?;
    collect_events(rows)
}

/// Remove an event once the mirror has applied it.
pub fn complete_mirror_event(conn: &Connection, event_id: i64) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM mirror_outbox WHERE id = ?1", params![event_id])?;
    Ok(())
}

pub fn record_mirror_failure(
    conn: &Connection,
    event_id: i64,
    error: &str,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE mirror_outbox SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
        params![event_id, error],
    )?;
    Ok(())
}

/// Take an event out of the drain order. It stays in the table with its
/// last error until the parked events are discarded.
pub fn park_mirror_event(conn: &Connection, event_id: i64) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE mirror_outbox SET parked_at = datetime('now') WHERE id = ?1",
        params![event_id],
    )?;
    Ok(())
}

/// Distinct rows with at least one parked event, lowest id first.
pub fn parked_mirror_sql_ids(conn: &Connection) -> Result<Vec<i64>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT sql_id FROM mirror_outbox WHERE parked_at IS NOT NULL ORDER BY sql_id ASC",
    )?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub fn discard_parked_mirror_events(conn: &Connection) -> Result<usize, DatabaseError> {
    let count = conn.execute("DELETE FROM mirror_outbox WHERE parked_at IS NOT NULL", [])?;
    Ok(count)
}

pub fn count_pending_mirror_events(conn: &Connection) -> Result<u64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM mirror_outbox WHERE parked_at IS NULL",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count as u64)
}

pub fn count_parked_mirror_events(conn: &Connection) -> Result<u64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM mirror_outbox WHERE parked_at IS NOT NULL",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count as u64)
}

struct EventRow {
    id: i64,
    sql_id: i64,
    op: String,
    payload: Option<String>,
    attempts: u32,
    last_error: Option<String>,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        sql_id: row.get(1)?,
        op: row.get(2)?,
        payload: row.get(3)?,
        attempts: row.get(4)?,
        last_error: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn collect_events(
    rows: impl Iterator<Item = rusqlite::Result<EventRow>>,
) -> Result<Vec<MirrorEvent>, DatabaseError> {
    let mut events = Vec::new();
    for row in rows {
        let row = row?;
        events.push(MirrorEvent {
            id: row.id,
            sql_id: row.sql_id,
            op: MirrorOp::from_str(&row.op)?,
            payload: row.payload,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: parse_timestamp(&row.created_at)?,
        });
    }
    Ok(events)
}

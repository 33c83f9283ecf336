//! Repository layer: entity-scoped database operations on the record store.

mod outbox;
mod patient;
mod user;

use chrono::NaiveDateTime;

use super::DatabaseError;

pub use outbox::*;
pub use patient::*;
pub use user::*;

/// SQLite `datetime('now')` produces `YYYY-MM-DD HH:MM:SS`; older rows may
/// carry a `T` separator.
pub(crate) fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {raw:?}: {e}")))
}

//! Patient mirror: the document-oriented read replica.
//!
//! The record store stays authoritative. Every mutation appends an event to
//! the `mirror_outbox` table inside the same transaction as the row write;
//! [`relay::MirrorRelay`] applies those events here, retrying until the
//! mirror converges.

pub mod document_store;
pub mod memory;
pub mod relay;
pub mod types;

use thiserror::Error;

use crate::db::DatabaseError;

pub use document_store::SqliteDocumentStore;
pub use memory::InMemoryMirrorStore;
pub use relay::{DrainReport, MirrorRelay, MirrorSync};
pub use types::{MirrorStore, PatientDocument};

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Mirror database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Mirror document encoding error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Mirror write failed for sql_id {sql_id}: {reason}")]
    WriteFailure { sql_id: i64, reason: String },

    #[error("Mirror event {event_id} has no payload")]
    MissingPayload { event_id: i64 },

    #[error("Mirror store unavailable: {0}")]
    Unavailable(String),
}

impl MirrorError {
    /// Errors that no retry can fix: the event itself is broken.
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Serialization(_) | Self::MissingPayload { .. })
    }
}

impl From<rusqlite::Error> for MirrorError {
    fn from(err: rusqlite::Error) -> Self {
        MirrorError::Database(DatabaseError::Sqlite(err))
    }
}

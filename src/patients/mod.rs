//! Patient mutation orchestration across the record store and the mirror.

mod orchestrator;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::{InputError, InvalidLabel};

pub use orchestrator::{DashboardStats, PatientService};

#[derive(Error, Debug)]
pub enum PatientError {
    #[error("Patient {0} not found")]
    NotFound(i64),

    #[error(transparent)]
    InvalidLabel(#[from] InvalidLabel),

    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Record store error: {0}")]
    Database(DatabaseError),

    #[error("Mirror document encoding error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<InputError> for PatientError {
    fn from(err: InputError) -> Self {
        match err {
            InputError::Invalid { field, reason } => PatientError::Invalid { field, reason },
            InputError::Label(label) => PatientError::InvalidLabel(label),
        }
    }
}

impl From<DatabaseError> for PatientError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { ref id, .. } => match id.parse() {
                Ok(id) => PatientError::NotFound(id),
                Err(_) => PatientError::Database(err),
            },
            other => PatientError::Database(other),
        }
    }
}

impl From<rusqlite::Error> for PatientError {
    fn from(err: rusqlite::Error) -> Self {
        PatientError::Database(DatabaseError::Sqlite(err))
    }
}

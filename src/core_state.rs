//! Shared application state for the HTTP layer and the CLI jobs.
//!
//! Holds configuration and the long-lived services. Database connections
//! are not shared: every request opens its own through [`CoreState::open_db`].

use std::sync::Arc;

use crate::auth::{self, AuthError};
use crate::config::AppConfig;
use crate::db::{self, mirror_db};
use crate::mirror::{MirrorRelay, MirrorStore, SqliteDocumentStore};
use crate::patients::PatientService;
use crate::prediction::PredictionService;

pub struct CoreState {
    pub config: AppConfig,
    relay: Arc<MirrorRelay>,
    patients: PatientService,
    predictor: PredictionService,
}

impl CoreState {
    /// State over an explicit mirror store.
    pub fn new(config: AppConfig, mirror: Arc<dyn MirrorStore>) -> Self {
        let relay = Arc::new(MirrorRelay::new(mirror));
        Self {
            patients: PatientService::new(relay.clone()),
            predictor: PredictionService::new(&config.model_path),
            relay,
            config,
        }
    }

    /// Prepare the data directory, both stores and the default admin,
    /// then build state over the on-disk mirror.
    pub fn bootstrap(config: AppConfig) -> Result<Self, CoreError> {
        config.ensure_data_dir()?;

        let conn = db::open_database(&config.records_db_path())?;
        auth::ensure_default_admin(&conn, &config.admin_password)?;
        drop(conn);

        // Fail early on an unusable mirror file rather than at first write.
        mirror_db::open_mirror_database(&config.mirror_db_path())?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            model = %config.model_path.display(),
            "Stores ready"
        );

        let mirror = Arc::new(SqliteDocumentStore::new(&config.mirror_db_path()));
        Ok(Self::new(config, mirror))
    }

    /// Open a connection to the record store.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(&self.config.records_db_path()).map_err(CoreError::Database)
    }

    pub fn patients(&self) -> &PatientService {
        &self.patients
    }

    pub fn predictor(&self) -> &PredictionService {
        &self.predictor
    }

    pub fn relay(&self) -> &Arc<MirrorRelay> {
        &self.relay
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Credential bootstrap failed: {0}")]
    Auth(#[from] AuthError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

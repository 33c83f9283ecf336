use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Application-level constants
pub const APP_NAME: &str = "StrokeWatch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Username seeded into an empty credential store.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Login sessions expire after 30 minutes.
pub const SESSION_LIFETIME_SECS: u64 = 30 * 60;

/// Background relay cadence for pending mirror events.
pub const DEFAULT_RELAY_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_RELAY_BATCH: usize = 100;
/// Failed writes an event may accumulate before the relay parks it.
pub const MAX_MIRROR_ATTEMPTS: u32 = 50;

const DEFAULT_BIND: &str = "127.0.0.1:8080";

const ENV_DATA_DIR: &str = "STROKEWATCH_DATA_DIR";
const ENV_MODEL_PATH: &str = "STROKEWATCH_MODEL_PATH";
const ENV_BIND: &str = "STROKEWATCH_BIND";
const ENV_ADMIN_PASSWORD: &str = "STROKEWATCH_ADMIN_PASSWORD";

/// Default tracing filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "strokewatch_lib=info,strokewatch=info"
}

/// Get the application data directory
/// ~/StrokeWatch/ unless overridden by `STROKEWATCH_DATA_DIR`.
pub fn app_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Runtime configuration shared by the server and the CLI jobs.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub model_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub admin_password: String,
    pub relay_interval_secs: u64,
    pub relay_batch: usize,
}

impl AppConfig {
    /// Build the configuration from environment variables, falling back
    /// to defaults under [`app_data_dir`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = app_data_dir();
        let model_path = std::env::var(ENV_MODEL_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_model_path(&data_dir));
        let bind = std::env::var(ENV_BIND).unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind.clone()))?;
        let admin_password = std::env::var(ENV_ADMIN_PASSWORD)
            .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());

        Ok(Self {
            data_dir,
            model_path,
            bind_addr,
            admin_password,
            relay_interval_secs: DEFAULT_RELAY_INTERVAL_SECS,
            relay_batch: DEFAULT_RELAY_BATCH,
        })
    }

    /// Configuration rooted at an explicit directory (tests, CLI overrides).
    pub fn rooted_at(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            model_path: default_model_path(data_dir),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            relay_interval_secs: DEFAULT_RELAY_INTERVAL_SECS,
            relay_batch: DEFAULT_RELAY_BATCH,
        }
    }

    /// Move the stores to `data_dir`. The model path follows unless it was
    /// set through the environment.
    pub fn with_data_dir(mut self, data_dir: &Path) -> Self {
        if std::env::var_os(ENV_MODEL_PATH).is_none() {
            self.model_path = default_model_path(data_dir);
        }
        self.data_dir = data_dir.to_path_buf();
        self
    }

    /// System of record: users, patients and the mirror outbox.
    pub fn records_db_path(&self) -> PathBuf {
        self.data_dir.join("records.db")
    }

    /// Document-oriented mirror of the patient table.
    pub fn mirror_db_path(&self) -> PathBuf {
        self.data_dir.join("mirror.db")
    }

    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

fn default_model_path(data_dir: &Path) -> PathBuf {
    data_dir.join("models").join("stroke_model.json")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid bind address: {0}")]
    InvalidBind(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_live_under_data_dir() {
        let cfg = AppConfig::rooted_at(Path::new("/tmp/sw"));
        assert!(cfg.records_db_path().starts_with("/tmp/sw"));
        assert!(cfg.mirror_db_path().ends_with("mirror.db"));
        assert_ne!(cfg.records_db_path(), cfg.mirror_db_path());
    }

    #[test]
    fn model_path_under_models_dir() {
        let cfg = AppConfig::rooted_at(Path::new("/tmp/sw"));
        assert!(cfg.model_path.ends_with("models/stroke_model.json"));
    }

    #[test]
    fn with_data_dir_moves_stores() {
        let cfg = AppConfig::rooted_at(Path::new("/tmp/a")).with_data_dir(Path::new("/tmp/b"));
        assert!(cfg.records_db_path().starts_with("/tmp/b"));
        assert!(cfg.mirror_db_path().starts_with("/tmp/b"));
    }

    #[test]
    fn app_name_is_strokewatch() {
        assert_eq!(APP_NAME, "StrokeWatch");
    }

    #[test]
    fn session_lifetime_is_thirty_minutes() {
        assert_eq!(SESSION_LIFETIME_SECS, 1800);
    }
}

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use super::model::ModelBundle;
use super::PredictionError;

/// Lazily loaded, process-wide model.
///
/// The first successful load is cached for the life of the handle. A failed
/// load is not cached, so dropping an artifact in place later takes effect
/// without a restart.
pub struct ModelHandle {
    path: PathBuf,
    cell: OnceLock<Arc<ModelBundle>>,
}

impl ModelHandle {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            cell: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Result<Arc<ModelBundle>, PredictionError> {
        if let Some(bundle) = self.cell.get() {
            return Ok(bundle.clone());
        }

        // Concurrent first calls may both load; the first set wins.
        let loaded = Arc::new(ModelBundle::load(&self.path)?);
        tracing::info!(
            path = %self.path.display(),
            version = loaded.version.as_deref().unwrap_or("unversioned"),
            "Risk model loaded"
        );
        Ok(self.cell.get_or_init(|| loaded).clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::toy_bundle;

    #[test]
    fn missing_file_is_retried_after_it_appears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let handle = ModelHandle::new(&path);

        assert!(matches!(handle.get(), Err(PredictionError::ModelUnavailable(_))));
        assert!(!handle.is_loaded());

        toy_bundle().save(&path).unwrap();
        assert!(handle.get().is_ok());
        assert!(handle.is_loaded());
    }

    #[test]
    fn loaded_once_and_shared() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        toy_bundle().save(&path).unwrap();
        let handle = ModelHandle::new(&path);

        let first = handle.get().unwrap();
        std::fs::remove_file(&path).unwrap();
        let second = handle.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}

//! Stroke-risk inference.
//!
//! A [`Prediction`] is computed on demand from the record-store row; it is
//! never persisted. The model artifact is loaded lazily through
//! [`loader::ModelHandle`] and shared read-only across requests.

pub mod features;
pub mod loader;
pub mod model;

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::models::Patient;

pub use features::{FeatureRow, FeatureValue, FEATURE_COLUMNS};
pub use loader::ModelHandle;
pub use model::{LogisticClassifier, ModelBundle, ModelMeta, Preprocessor, StrokePipeline};

/// Probability at or above which the label is 1.
pub const DECISION_THRESHOLD: f64 = 0.5;

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Model artifact not found at {0}. Run `strokewatch train` first.")]
    ModelUnavailable(PathBuf),

    #[error("Model artifact {path} is malformed: {reason}")]
    MalformedArtifact { path: PathBuf, reason: String },

    #[error("Feature {column} cannot be encoded: {reason}")]
    InvalidFeature { column: String, reason: String },

    #[error("Model score is not a finite number for this patient")]
    NonFiniteScore,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Probability of class 1 (stroke), in [0, 1].
    pub probability: f64,
    pub label: u8,
    pub model_version: Option<String>,
}

/// Maps patients to model inputs and runs the shared model.
pub struct PredictionService {
    model: ModelHandle,
}

impl PredictionService {
    pub fn new(model_path: &Path) -> Self {
        Self {
            model: ModelHandle::new(model_path),
        }
    }

    pub fn predict(&self, patient: &Patient) -> Result<Prediction, PredictionError> {
        let bundle = self.model.get()?;
        let row = FeatureRow::from_patient(patient);

        let probability = bundle.pipeline.predict_proba(&row)?;
        let label = u8::from(probability >= DECISION_THRESHOLD);

        tracing::debug!(
            patient_id = patient.id,
            probability,
            label,
            "Stroke risk computed"
        );

        Ok(Prediction {
            probability,
            label,
            model_version: bundle.version.clone(),
        })
    }

    pub fn model_path(&self) -> &Path {
        self.model.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Gender;
    use crate::test_support::{arb_patient_input, patient_from_input, sample_patient, toy_bundle};
    use proptest::prelude::*;

    #[test]
    fn missing_artifact_is_model_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let service = PredictionService::new(&dir.path().join("absent.json"));
        let err = service.predict(&sample_patient(1)).unwrap_err();
        assert!(matches!(err, PredictionError::ModelUnavailable(_)));
    }

    #[test]
    fn probability_in_range_and_label_matches_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        toy_bundle().save(&path).unwrap();
        let service = PredictionService::new(&path);

        let mut patient = sample_patient(1);
        for age in [0.0, 18.0, 45.0, 67.0, 90.0, 120.0] {
            for bmi in [None, Some(0.0), Some(22.0), Some(60.0)] {
                patient.age = age;
                patient.bmi = bmi;
                patient.gender = if age > 50.0 { Gender::Male } else { Gender::Other };
                let p = service.predict(&patient).unwrap();
                assert!((0.0..=1.0).contains(&p.probability));
                assert_eq!(p.label == 1, p.probability >= DECISION_THRESHOLD);
            }
        }
    }

    #[test]
    fn prediction_carries_model_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        toy_bundle().save(&path).unwrap();

        let p = PredictionService::new(&path)
            .predict(&sample_patient(1))
            .unwrap();
        assert_eq!(p.model_version.as_deref(), Some("toy_v1"));
    }

    #[test]
    fn overflowing_score_degrades_to_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut bundle = toy_bundle();
        bundle.pipeline.classifier.coefficients[3] = 1e306;
        bundle.pipeline.classifier.coefficients[4] = -1e306;
        bundle.save(&path).unwrap();

        let mut patient = sample_patient(1);
        patient.avg_glucose_level = 1000.0;
        patient.bmi = Some(200.0);
        let err = PredictionService::new(&path).predict(&patient).unwrap_err();
        assert!(matches!(err, PredictionError::NonFiniteScore));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_prediction_in_range_with_label_at_threshold(
            input in arb_patient_input(),
            weights in proptest::collection::vec(-20.0f64..20.0, 18),
            intercept in -20.0f64..20.0,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("model.json");
            let mut bundle = toy_bundle();
            bundle.pipeline.classifier.coefficients = weights;
            bundle.pipeline.classifier.intercept = intercept;
            bundle.save(&path).unwrap();

            let p = PredictionService::new(&path)
                .predict(&patient_from_input(1, &input))
                .unwrap();
            prop_assert!((0.0..=1.0).contains(&p.probability));
            prop_assert_eq!(p.label == 1, p.probability >= DECISION_THRESHOLD);
        }

        #[test]
        fn prop_extreme_weights_never_yield_nan(
            input in arb_patient_input(),
            weights in proptest::collection::vec(proptest::num::f64::NORMAL, 18),
            intercept in proptest::num::f64::NORMAL,
        ) {
            let mut bundle = toy_bundle();
            bundle.pipeline.classifier.coefficients = weights;
            bundle.pipeline.classifier.intercept = intercept;
            let row = FeatureRow::from_patient(&patient_from_input(1, &input));

            match bundle.pipeline.predict_proba(&row) {
                Ok(p) => prop_assert!((0.0..=1.0).contains(&p)),
                Err(e) => prop_assert!(matches!(e, PredictionError::NonFiniteScore)),
            }
        }
    }
}

//! Serialized model artifact: a preprocessing step feeding a logistic
//! classifier, plus version and training metadata.
//!
//! Preprocessing output layout is every numeric column in declared order,
//! then one indicator block per categorical column.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::features::{FeatureRow, FeatureValue};
use super::{PredictionError, DECISION_THRESHOLD};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub pipeline: StrokePipeline,
    #[serde(default)]
    pub version: Option<String>,
    pub meta: ModelMeta,
}

/// Recorded at training time. `feature_cols` is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub feature_cols: Vec<String>,
    pub target_col: String,
    pub numeric_features: Vec<String>,
    pub categorical_features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokePipeline {
    pub preprocess: Preprocessor,
    pub classifier: LogisticClassifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<OneHotColumn>,
}

/// Passthrough column. `fill_value` replaces a missing value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    #[serde(default)]
    pub fill_value: Option<f64>,
}

/// One-hot column. Unseen or missing categories encode as all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotColumn {
    pub name: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl Preprocessor {
    /// Width of the encoded vector.
    pub fn width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    pub fn transform(&self, row: &FeatureRow) -> Result<Vec<f64>, PredictionError> {
        let mut encoded = Vec::with_capacity(self.width());

        for column in &self.numeric {
            let value = match row.get(&column.name) {
                Some(FeatureValue::Number(v)) => v.or(column.fill_value),
                Some(FeatureValue::Category(_)) => {
                    return Err(invalid_feature(&column.name, "expected a number"))
                }
                None => return Err(invalid_feature(&column.name, "missing from input")),
            };
            match value {
                Some(v) if v.is_finite() => encoded.push(v),
                _ => return Err(invalid_feature(&column.name, "no value and no fill value")),
            }
        }

        for column in &self.categorical {
            let value = match row.get(&column.name) {
                Some(FeatureValue::Category(v)) => v.as_deref(),
                Some(FeatureValue::Number(_)) => {
                    return Err(invalid_feature(&column.name, "expected a category"))
                }
                None => return Err(invalid_feature(&column.name, "missing from input")),
            };
            encoded.extend(
                column
                    .categories
                    .iter()
                    .map(|c| if Some(c.as_str()) == value { 1.0 } else { 0.0 }),
            );
        }

        Ok(encoded)
    }
}

impl LogisticClassifier {
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(x)
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept
    }

    pub fn probability(&self, x: &[f64]) -> f64 {
        sigmoid(self.decision_function(x))
    }
}

impl StrokePipeline {
    /// Probability of the positive class.
    pub fn predict_proba(&self, row: &FeatureRow) -> Result<f64, PredictionError> {
        let x = self.preprocess.transform(row)?;
        let z = self.classifier.decision_function(&x);
        if !z.is_finite() {
            return Err(PredictionError::NonFiniteScore);
        }
        Ok(sigmoid(z))
    }

    pub fn predict(&self, row: &FeatureRow) -> Result<u8, PredictionError> {
        let p = self.predict_proba(row)?;
        Ok(u8::from(p >= DECISION_THRESHOLD))
    }
}

impl ModelBundle {
    /// Read and validate an artifact.
    pub fn load(path: &Path) -> Result<Self, PredictionError> {
        if !path.exists() {
            return Err(PredictionError::ModelUnavailable(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let bundle: ModelBundle = serde_json::from_str(&raw).map_err(|e| malformed(path, e))?;
        bundle.validate().map_err(|reason| malformed(path, reason))?;
        Ok(bundle)
    }

    pub fn save(&self, path: &Path) -> Result<(), PredictionError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    fn validate(&self) -> Result<(), String> {
        let width = self.pipeline.preprocess.width();
        let coefficients = self.pipeline.classifier.coefficients.len();
        if width != coefficients {
            return Err(format!(
                "preprocessing yields {width} features but classifier has {coefficients} coefficients"
            ));
        }
        if !self.pipeline.classifier.intercept.is_finite()
            || self.pipeline.classifier.coefficients.iter().any(|w| !w.is_finite())
        {
            return Err("classifier weights must be finite".into());
        }
        Ok(())
    }
}

/// Logistic function, stable for large |z|.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn invalid_feature(column: &str, reason: &str) -> PredictionError {
    PredictionError::InvalidFeature {
        column: column.to_string(),
        reason: reason.to_string(),
    }
}

fn malformed(path: &Path, reason: impl ToString) -> PredictionError {
    PredictionError::MalformedArtifact {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

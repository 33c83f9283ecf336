//! Offline training job: CSV dataset in, model artifact out.
//!
//! Produces the [`ModelBundle`] the prediction service loads. Numeric
//! columns pass through (bmi median-imputed), categorical columns are
//! one-hot encoded over the categories seen in training, and a
//! class-balanced logistic regression is fitted on top.

pub mod dataset;
pub mod logistic;
pub mod metrics;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::prediction::model::{ModelBundle, ModelMeta, NumericColumn, OneHotColumn, Preprocessor, StrokePipeline};
use crate::prediction::{FeatureRow, FeatureValue, PredictionError, FEATURE_COLUMNS};

use dataset::{load_dataset, stratified_split, Dataset};
use logistic::{fit_logistic, LogisticParams};
use metrics::{accuracy, roc_auc, ClassificationReport};

pub const NUMERIC_FEATURES: [&str; 5] =
    ["age", "hypertension", "heart_disease", "avg_glucose_level", "bmi"];
pub const CATEGORICAL_FEATURES: [&str; 5] =
    ["gender", "ever_married", "work_type", "residence_type", "smoking_status"];
pub const TARGET_COLUMN: &str = "stroke";

/// Below this many labeled rows the model is fitted and scored on everything.
const MIN_SPLIT_SAMPLES: usize = 10;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("CSV not found: {0}")]
    InputNotFound(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column in CSV: {0}")]
    MissingColumn(String),

    #[error("Line {line}: invalid {column} value {value:?}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("No labeled rows to train on")]
    EmptyDataset,

    #[error("Column {0} has no usable values")]
    NoValues(&'static str),

    #[error("Invalid penalty {0:?} (expected \"l2\" or \"none\")")]
    InvalidPenalty(String),

    #[error(transparent)]
    Model(#[from] PredictionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Penalty {
    L2,
    None,
}

impl FromStr for Penalty {
    type Err = TrainingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2" => Ok(Penalty::L2),
            "none" => Ok(Penalty::None),
            other => Err(TrainingError::InvalidPenalty(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub input_csv: PathBuf,
    pub output_model: PathBuf,
    pub test_size: f64,
    pub seed: u64,
    pub penalty: Penalty,
    pub c: f64,
    pub max_iter: usize,
    pub version: String,
}

impl TrainConfig {
    pub fn new(input_csv: &Path, output_model: &Path) -> Self {
        Self {
            input_csv: input_csv.to_path_buf(),
            output_model: output_model.to_path_buf(),
            test_size: 0.2,
            seed: 42,
            penalty: Penalty::L2,
            c: 1.0,
            max_iter: 1000,
            version: "logreg_v1".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub classes: usize,
    pub dropped_rows: usize,
    /// False when the dataset was too small to hold out a test set.
    pub held_out: bool,
    pub test_samples: usize,
    pub accuracy: f64,
    pub roc_auc: Option<f64>,
    pub classification: ClassificationReport,
    pub version: String,
    pub output: PathBuf,
}

pub fn train_and_save(cfg: &TrainConfig) -> Result<TrainingReport, TrainingError> {
    tracing::info!(input = %cfg.input_csv.display(), "Loading training data");
    let data = load_dataset(&cfg.input_csv)?;

    let samples = data.len();
    let classes = data.class_count();
    tracing::info!(samples, classes, dropped = data.dropped, "Training data loaded");

    let held_out = samples >= MIN_SPLIT_SAMPLES && classes >= 2;
    let (train, test) = if held_out {
        stratified_split(&data, cfg.test_size, cfg.seed)
    } else {
        tracing::warn!(
            samples,
            classes,
            "Dataset too small or single-class, training and scoring on all rows"
        );
        (data.clone(), data.clone())
    };

    let preprocess = build_preprocessor(&train, data.bmi_median)?;
    let x_train = encode(&preprocess, &train)?;
    let params = LogisticParams {
        penalty: cfg.penalty,
        c: cfg.c,
        max_iter: cfg.max_iter,
    };
    tracing::info!(c = cfg.c, penalty = ?cfg.penalty, max_iter = cfg.max_iter, "Fitting logistic regression");
    let classifier = fit_logistic(&x_train, &train.labels, &params);

    let pipeline = StrokePipeline {
        preprocess,
        classifier,
    };

    let x_test = encode(&pipeline.preprocess, &test)?;
    let probabilities: Vec<f64> = x_test
        .iter()
        .map(|x| pipeline.classifier.probability(x))
        .collect();
    let predicted: Vec<u8> = probabilities
        .iter()
        .map(|p| u8::from(*p >= crate::prediction::DECISION_THRESHOLD))
        .collect();

    let acc = accuracy(&test.labels, &predicted);
    let auc = roc_auc(&test.labels, &probabilities);
    let classification = ClassificationReport::new(&test.labels, &predicted);

    let bundle = ModelBundle {
        pipeline,
        version: Some(cfg.version.clone()),
        meta: ModelMeta {
            feature_cols: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            target_col: TARGET_COLUMN.into(),
            numeric_features: NUMERIC_FEATURES.iter().map(|c| c.to_string()).collect(),
            categorical_features: CATEGORICAL_FEATURES.iter().map(|c| c.to_string()).collect(),
        },
    };
    bundle.save(&cfg.output_model)?;
    tracing::info!(
        output = %cfg.output_model.display(),
        version = %cfg.version,
        accuracy = acc,
        "Model saved"
    );

    Ok(TrainingReport {
        samples,
        classes,
        dropped_rows: data.dropped,
        held_out,
        test_samples: test.len(),
        accuracy: acc,
        roc_auc: auc,
        classification,
        version: cfg.version.clone(),
        output: cfg.output_model.clone(),
    })
}

/// Numeric passthrough with the bmi fill value, categories learned from
/// the training rows in sorted order.
fn build_preprocessor(train: &Dataset, bmi_median: Option<f64>) -> Result<Preprocessor, TrainingError> {
    let bmi_fill = bmi_median.ok_or(TrainingError::NoValues("bmi"))?;

    let numeric = NUMERIC_FEATURES
        .iter()
        .map(|&name| NumericColumn {
            name: name.to_string(),
            fill_value: (name == "bmi").then_some(bmi_fill),
        })
        .collect();

    let categorical = CATEGORICAL_FEATURES
        .iter()
        .map(|&name| {
            let mut categories: Vec<String> = train
                .rows
                .iter()
                .filter_map(|row| match row.get(name) {
                    Some(FeatureValue::Category(Some(value))) => Some(value.clone()),
                    _ => None,
                })
                .collect();
            categories.sort();
            categories.dedup();
            OneHotColumn {
                name: name.to_string(),
                categories,
            }
        })
        .collect();

    Ok(Preprocessor {
        numeric,
        categorical,
    })
}

fn encode(preprocess: &Preprocessor, data: &Dataset) -> Result<Vec<Vec<f64>>, TrainingError> {
    data.rows
        .iter()
        .map(|row: &FeatureRow| preprocess.transform(row).map_err(TrainingError::from))
        .collect()
}

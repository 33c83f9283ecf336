use std::path::Path;

use csv::StringRecord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{TrainingError, CATEGORICAL_FEATURES};
use crate::dataset::{is_missing, ColumnMap};
use crate::prediction::{FeatureRow, FeatureValue, FEATURE_COLUMNS};

/// Labeled feature rows ready for encoding.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub rows: Vec<FeatureRow>,
    pub labels: Vec<u8>,
    /// Rows skipped because the label was missing.
    pub dropped: usize,
    /// Median of the present bmi values over the whole file.
    pub bmi_median: Option<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn class_count(&self) -> usize {
        let has = |c: u8| self.labels.contains(&c);
        usize::from(has(0)) + usize::from(has(1))
    }

    fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            dropped: 0,
            bmi_median: self.bmi_median,
        }
    }
}

pub fn load_dataset(path: &Path) -> Result<Dataset, TrainingError> {
    if !path.exists() {
        return Err(TrainingError::InputNotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let columns = ColumnMap::from_headers(reader.headers()?);
    if let Some(missing) = columns.first_missing() {
        return Err(TrainingError::MissingColumn(missing.to_string()));
    }

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    let mut dropped = 0;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let cell = |column: &'static str| columns.get(&record, column).unwrap_or("");

        let raw_label = cell("stroke");
        if is_missing(raw_label) {
            dropped += 1;
            continue;
        }
        let label = match parse_number(raw_label) {
            Some(v) if v == 0.0 => 0,
            Some(v) if v == 1.0 => 1,
            _ => return Err(invalid(line, "stroke", raw_label)),
        };

        rows.push(read_features(&record, &columns, line)?);
        labels.push(label);
    }

    if labels.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }

    let bmi_median = median(rows.iter().filter_map(|row| match row.get("bmi") {
        Some(FeatureValue::Number(v)) => *v,
        _ => None,
    }));

    Ok(Dataset {
        rows,
        labels,
        dropped,
        bmi_median,
    })
}

fn read_features(
    record: &StringRecord,
    columns: &ColumnMap,
    line: u64,
) -> Result<FeatureRow, TrainingError> {
    let mut values = Vec::with_capacity(FEATURE_COLUMNS.len());
    for &column in FEATURE_COLUMNS.iter() {
        let raw = columns.get(record, column).unwrap_or("");
        let value = if CATEGORICAL_FEATURES.contains(&column) {
            FeatureValue::Category((!raw.is_empty()).then(|| raw.to_string()))
        } else if column == "bmi" {
            // Non-positive or unparseable bmi counts as missing.
            FeatureValue::Number(parse_number(raw).filter(|v| *v > 0.0))
        } else {
            let v = parse_number(raw).ok_or_else(|| invalid(line, column, raw))?;
            FeatureValue::Number(Some(v))
        };
        values.push((column, value));
    }
    Ok(FeatureRow::new(values))
}

/// Split each class separately so both sides keep the class ratio.
pub fn stratified_split(data: &Dataset, test_size: f64, seed: u64) -> (Dataset, Dataset) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx = Vec::new();
    let mut test_idx = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = (0..data.len()).filter(|&i| data.labels[i] == class).collect();
        if members.is_empty() {
            continue;
        }
        members.shuffle(&mut rng);

        let n = members.len();
        let n_test = if n < 2 {
            0
        } else {
            ((n as f64 * test_size).round() as usize).clamp(1, n - 1)
        };
        test_idx.extend_from_slice(&members[..n_test]);
        train_idx.extend_from_slice(&members[n_test..]);
    }

    train_idx.sort_unstable();
    test_idx.sort_unstable();
    (data.subset(&train_idx), data.subset(&test_idx))
}

fn parse_number(raw: &str) -> Option<f64> {
    if is_missing(raw) {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

fn invalid(line: u64, column: &'static str, value: &str) -> TrainingError {
    TrainingError::InvalidValue {
        line,
        column,
        value: value.to_string(),
    }
}

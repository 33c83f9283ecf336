//! Bulk CSV import into the record store.
//!
//! Rows go straight to the `patients` table in one transaction. The mirror
//! is not touched; run `sync-mirror --rebuild` afterwards to populate it.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::StringRecord;
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::dataset::{is_missing, ColumnMap};
use crate::db::repository::insert_patient;
use crate::db::DatabaseError;
use crate::models::enums::{EverMarried, Gender, ResidenceType};
use crate::models::{PatientInput, StrokeLabel};

/// Columns without a usable default.
const REQUIRED: [&str; 5] = ["gender", "age", "ever_married", "work_type", "residence_type"];

const DEFAULT_SMOKING_STATUS: &str = "Unknown";

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV file not found at {0}")]
    InputNotFound(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column in CSV: {0}")]
    MissingColumn(&'static str),

    #[error("Line {line}: invalid {column}: {reason}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        reason: String,
    },

    #[error("Record store error: {0}")]
    Database(#[from] DatabaseError),
}

impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::Database(DatabaseError::Sqlite(err))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
}

/// Import every row of `path`. Any bad row aborts the whole import.
pub fn import_patients(conn: &Connection, path: &Path) -> Result<ImportReport, ImportError> {
    if !path.exists() {
        return Err(ImportError::InputNotFound(path.to_path_buf()));
    }
    tracing::info!(path = %path.display(), "Importing patients");

    let mut reader = csv::Reader::from_path(path)?;
    let columns = ColumnMap::from_headers(reader.headers()?);
    if let Some(missing) = REQUIRED.iter().copied().find(|c| !columns.contains(c)) {
        return Err(ImportError::MissingColumn(missing));
    }

    let tx = conn.unchecked_transaction()?;
    let mut imported = 0;
    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let input = read_input(&record, &columns, line)?;
        let fields = input.validate().map_err(|e| ImportError::InvalidValue {
            line,
            column: "row",
            reason: e.to_string(),
        })?;
        insert_patient(&tx, &fields)?;
        imported += 1;
    }
    tx.commit()?;

    tracing::info!(imported, "Patients imported");
    Ok(ImportReport { imported })
}

fn read_input(
    record: &StringRecord,
    columns: &ColumnMap,
    line: u64,
) -> Result<PatientInput, ImportError> {
    let cell = |column: &str| columns.get(record, column);
    let bad = |column: &'static str, reason: String| ImportError::InvalidValue {
        line,
        column,
        reason,
    };

    let gender = Gender::from_str(cell("gender").unwrap_or(""))
        .map_err(|e| bad("gender", e.to_string()))?;
    let ever_married = EverMarried::from_str(cell("ever_married").unwrap_or(""))
        .map_err(|e| bad("ever_married", e.to_string()))?;
    let residence_type = ResidenceType::from_str(cell("residence_type").unwrap_or(""))
        .map_err(|e| bad("residence_type", e.to_string()))?;

    let raw_age = cell("age").unwrap_or("");
    let age = raw_age
        .parse::<f64>()
        .map_err(|_| bad("age", format!("{raw_age:?} is not a number")))?
        .trunc();

    let flag = |column: &'static str| -> Result<bool, ImportError> {
        match cell(column).unwrap_or("0") {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(bad(column, format!("{other:?} is not 0 or 1"))),
        }
    };

    let raw_glucose = cell("avg_glucose_level").filter(|v| !v.is_empty()).unwrap_or("0");
    let avg_glucose_level = raw_glucose
        .parse::<f64>()
        .map_err(|_| bad("avg_glucose_level", format!("{raw_glucose:?} is not a number")))?;

    let bmi = match cell("bmi") {
        Some(raw) if !is_missing(raw) => Some(
            raw.parse::<f64>()
                .map_err(|_| bad("bmi", format!("{raw:?} is not a number")))?,
        ),
        _ => None,
    };

    let smoking_status = cell("smoking_status")
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_SMOKING_STATUS)
        .to_string();

    let stroke = cell("stroke").map(str::to_string);
    StrokeLabel::parse_token(stroke.as_deref()).map_err(|e| bad("stroke", e.to_string()))?;

    Ok(PatientInput {
        gender,
        age,
        hypertension: flag("hypertension")?,
        heart_disease: flag("heart_disease")?,
        ever_married,
        work_type: cell("work_type").unwrap_or("").to_string(),
        residence_type,
        avg_glucose_level,
        bmi,
        smoking_status: Some(smoking_status),
        stroke,
    })
}

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{EverMarried, Gender, ResidenceType};
use super::stroke::{InvalidLabel, StrokeLabel};

const MAX_AGE: f64 = 120.0;
const MAX_TEXT_LEN: usize = 120;
/// mg/dL. Well above any physiological reading.
const MAX_GLUCOSE: f64 = 1000.0;
const MAX_BMI: f64 = 200.0;

/// A patient row as owned by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub gender: Gender,
    pub age: f64,
    pub hypertension: bool,
    pub heart_disease: bool,
    pub ever_married: EverMarried,
    pub work_type: String,
    pub residence_type: ResidenceType,
    pub avg_glucose_level: f64,
    pub bmi: Option<f64>,
    pub smoking_status: Option<String>,
    pub stroke: StrokeLabel,
    pub created_at: NaiveDateTime,
}

impl Patient {
    pub fn fields(&self) -> PatientFields {
        PatientFields {
            gender: self.gender,
            age: self.age,
            hypertension: self.hypertension,
            heart_disease: self.heart_disease,
            ever_married: self.ever_married,
            work_type: self.work_type.clone(),
            residence_type: self.residence_type,
            avg_glucose_level: self.avg_glucose_level,
            bmi: self.bmi,
            smoking_status: self.smoking_status.clone(),
            stroke: self.stroke,
        }
    }
}

/// Validated, typed patient attributes. Every mutation writes the whole set.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientFields {
    pub gender: Gender,
    pub age: f64,
    pub hypertension: bool,
    pub heart_disease: bool,
    pub ever_married: EverMarried,
    pub work_type: String,
    pub residence_type: ResidenceType,
    pub avg_glucose_level: f64,
    pub bmi: Option<f64>,
    pub smoking_status: Option<String>,
    pub stroke: StrokeLabel,
}

/// Patient form as submitted by a client.
///
/// `stroke` stays a raw token so the label policy lives in one place
/// ([`StrokeLabel::parse_token`]). Omitted optional fields are null,
/// never defaulted from the stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    pub gender: Gender,
    pub age: f64,
    #[serde(default)]
    pub hypertension: bool,
    #[serde(default)]
    pub heart_disease: bool,
    pub ever_married: EverMarried,
    pub work_type: String,
    pub residence_type: ResidenceType,
    pub avg_glucose_level: f64,
    #[serde(default)]
    pub bmi: Option<f64>,
    #[serde(default)]
    pub smoking_status: Option<String>,
    #[serde(default)]
    pub stroke: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error(transparent)]
    Label(#[from] InvalidLabel),
}

impl PatientInput {
    /// Check ranges and lengths, parse the stroke token.
    pub fn validate(&self) -> Result<PatientFields, InputError> {
        if !self.age.is_finite() || !(0.0..=MAX_AGE).contains(&self.age) {
            return Err(invalid("age", format!("must be between 0 and {MAX_AGE}")));
        }
        if !self.avg_glucose_level.is_finite()
            || !(0.0..=MAX_GLUCOSE).contains(&self.avg_glucose_level)
        {
            return Err(invalid(
                "avg_glucose_level",
                format!("must be between 0 and {MAX_GLUCOSE}"),
            ));
        }
        if let Some(bmi) = self.bmi {
            if !bmi.is_finite() || !(0.0..=MAX_BMI).contains(&bmi) {
                return Err(invalid("bmi", format!("must be between 0 and {MAX_BMI}")));
            }
        }

        let work_type = self.work_type.trim();
        if work_type.is_empty() {
            return Err(invalid("work_type", "is required".into()));
        }
        if work_type.chars().count() > MAX_TEXT_LEN {
            return Err(invalid("work_type", format!("longer than {MAX_TEXT_LEN} characters")));
        }

        let smoking_status = self
            .smoking_status
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if smoking_status.is_some_and(|s| s.chars().count() > MAX_TEXT_LEN) {
            return Err(invalid(
                "smoking_status",
                format!("longer than {MAX_TEXT_LEN} characters"),
            ));
        }

        let stroke = StrokeLabel::parse_token(self.stroke.as_deref())?;

        Ok(PatientFields {
            gender: self.gender,
            age: self.age,
            hypertension: self.hypertension,
            heart_disease: self.heart_disease,
            ever_married: self.ever_married,
            work_type: work_type.to_string(),
            residence_type: self.residence_type,
            avg_glucose_level: self.avg_glucose_level,
            bmi: self.bmi,
            smoking_status: smoking_status.map(str::to_string),
            stroke,
        })
    }
}

fn invalid(field: &'static str, reason: String) -> InputError {
    InputError::Invalid { field, reason }
}

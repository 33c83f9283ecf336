use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::MirrorError;
use crate::models::enums::{EverMarried, Gender, ResidenceType};
use crate::models::{Patient, StrokeLabel};

/// Denormalized copy of a patient row.
///
/// `sql_id` is a correlation key into the record store, not an identity of
/// its own: a document without a matching row is garbage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientDocument {
    pub sql_id: i64,
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

impl From<&Patient> for PatientDocument {
    fn from(patient: &Patient) -> Self {
        Self {
            sql_id: patient.id,
            gender: patient.gender,
            age: patient.age,
            hypertension: patient.hypertension,
            heart_disease: patient.heart_disease,
            ever_married: patient.ever_married,
            work_type: patient.work_type.clone(),
            residence_type: patient.residence_type,
            avg_glucose_level: patient.avg_glucose_level,
            bmi: patient.bmi,
            smoking_status: patient.smoking_status.clone(),
            stroke: patient.stroke,
            created_at: patient.created_at,
        }
    }
}

/// Document store abstraction for the mirror.
///
/// Implementations must make `upsert` and `delete_by_sql_id` idempotent:
/// the relay delivers at least once.
pub trait MirrorStore: Send + Sync {
    /// Insert or replace the document keyed by `doc.sql_id`.
    fn upsert(&self, doc: &PatientDocument) -> Result<(), MirrorError>;

    /// Remove the document for `sql_id`. Returns whether one existed;
    /// deleting a missing document is not an error.
    fn delete_by_sql_id(&self, sql_id: i64) -> Result<bool, MirrorError>;

    fn get_by_sql_id(&self, sql_id: i64) -> Result<Option<PatientDocument>, MirrorError>;

    fn count(&self) -> Result<u64, MirrorError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_patient;

    #[test]
    fn document_copies_patient_and_correlates_by_id() {
        let patient = sample_patient(17);
        let doc = PatientDocument::from(&patient);
        assert_eq!(doc.sql_id, 17);
        assert_eq!(doc.avg_glucose_level, patient.avg_glucose_level);
        assert_eq!(doc.stroke, patient.stroke);
    }

    #[test]
    fn json_shape_uses_dataset_field_names() {
        let doc = PatientDocument::from(&sample_patient(3));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["sql_id"], 3);
        assert_eq!(json["gender"], "Female");
        assert_eq!(json["residence_type"], "Urban");
        assert!(json["stroke"].is_null());
    }
}

use crate::models::Patient;

/// Model input columns, in the order the training job emits them.
pub const FEATURE_COLUMNS: [&str; 10] = [
    "gender",
    "age",
    "hypertension",
    "heart_disease",
    "ever_married",
    "work_type",
    "residence_type",
    "avg_glucose_level",
    "bmi",
    "smoking_status",
];

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Number(Option<f64>),
    Category(Option<String>),
}

/// One named input row, looked up by column name at transform time.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    values: Vec<(&'static str, FeatureValue)>,
}

impl FeatureRow {
    pub fn from_patient(patient: &Patient) -> Self {
        use FeatureValue::{Category, Number};

        let flag = |b: bool| Number(Some(if b { 1.0 } else { 0.0 }));
        let values = vec![
            ("gender", Category(Some(patient.gender.as_str().to_string()))),
            ("age", Number(Some(patient.age))),
            ("hypertension", flag(patient.hypertension)),
            ("heart_disease", flag(patient.heart_disease)),
            ("ever_married", Category(Some(patient.ever_married.as_str().to_string()))),
            ("work_type", Category(Some(patient.work_type.clone()))),
            ("residence_type", Category(Some(patient.residence_type.as_str().to_string()))),
            ("avg_glucose_level", Number(Some(patient.avg_glucose_level))),
            ("bmi", Number(patient.bmi)),
            ("smoking_status", Category(patient.smoking_status.clone())),
        ];
        Self { values }
    }

    pub fn new(values: Vec<(&'static str, FeatureValue)>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.values
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().map(|(name, _)| *name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_patient;

    #[test]
    fn row_follows_fixed_column_order() {
        let row = FeatureRow::from_patient(&sample_patient(1));
        let columns: Vec<&str> = row.columns().collect();
        assert_eq!(columns, FEATURE_COLUMNS);
    }

    #[test]
    fn flags_become_zero_or_one() {
        let row = FeatureRow::from_patient(&sample_patient(1));
        assert_eq!(row.get("hypertension"), Some(&FeatureValue::Number(Some(1.0))));
        assert_eq!(row.get("heart_disease"), Some(&FeatureValue::Number(Some(0.0))));
    }

    #[test]
    fn bmi_passes_through_raw() {
        let mut patient = sample_patient(1);
        patient.bmi = None;
        let row = FeatureRow::from_patient(&patient);
        assert_eq!(row.get("bmi"), Some(&FeatureValue::Number(None)));
        assert_eq!(
            row.get("residence_type"),
            Some(&FeatureValue::Category(Some("Urban".into())))
        );
    }
}

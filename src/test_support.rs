//! Shared fixtures for unit tests.

use chrono::NaiveDate;
use proptest::prelude::*;

use crate::models::enums::{EverMarried, Gender, ResidenceType};
use crate::models::{Patient, PatientFields, PatientInput, StrokeLabel};

/// The reference intake form: 67-year-old woman, hypertensive, unlabeled.
pub(crate) fn sample_input() -> PatientInput {
    PatientInput {
        gender: Gender::Female,
        age: 67.0,
        hypertension: true,
        heart_disease: false,
        ever_married: EverMarried::Yes,
        work_type: "Private".into(),
        residence_type: ResidenceType::Urban,
        avg_glucose_level: 228.69,
        bmi: Some(36.6),
        smoking_status: Some("formerly smoked".into()),
        stroke: Some(String::new()),
    }
}

pub(crate) fn sample_fields() -> PatientFields {
    PatientFields {
        gender: Gender::Female,
        age: 67.0,
        hypertension: true,
        heart_disease: false,
        ever_married: EverMarried::Yes,
        work_type: "Private".into(),
        residence_type: ResidenceType::Urban,
        avg_glucose_level: 228.69,
        bmi: Some(36.6),
        smoking_status: Some("formerly smoked".into()),
        stroke: StrokeLabel::Unknown,
    }
}

pub(crate) fn sample_patient(id: i64) -> Patient {
    let f = sample_fields();
    Patient {
        id,
        gender: f.gender,
        age: f.age,
        hypertension: f.hypertension,
        heart_disease: f.heart_disease,
        ever_married: f.ever_married,
        work_type: f.work_type,
        residence_type: f.residence_type,
        avg_glucose_level: f.avg_glucose_level,
        bmi: f.bmi,
        smoking_status: f.smoking_status,
        stroke: f.stroke,
        created_at: NaiveDate::from_ymd_opt(2024, 1, 15)
            .and_then(|d| d.and_hms_opt(10, 0, 0))
            .unwrap(),
    }
}

/// Any intake form that passes validation.
pub(crate) fn arb_patient_input() -> impl Strategy<Value = PatientInput> {
    let gender = prop_oneof![Just(Gender::Male), Just(Gender::Female), Just(Gender::Other)];
    let ever_married = prop_oneof![Just(EverMarried::Yes), Just(EverMarried::No)];
    let residence_type = prop_oneof![Just(ResidenceType::Urban), Just(ResidenceType::Rural)];
    let smoking_status = proptest::option::of(prop_oneof![
        Just("never smoked".to_string()),
        Just("formerly smoked".to_string()),
        Just("smokes".to_string()),
        "[A-Za-z ]{0,30}",
    ]);
    let stroke = prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("None".to_string())),
        Just(Some("0".to_string())),
        Just(Some(" 1 ".to_string())),
        Just(Some("1".to_string())),
    ];

    (
        gender,
        0.0f64..=120.0,
        any::<bool>(),
        any::<bool>(),
        ever_married,
        "[A-Za-z_-]{1,40}",
        residence_type,
        0.0f64..=1000.0,
        proptest::option::of(0.0f64..=200.0),
        smoking_status,
        stroke,
    )
        .prop_map(
            |(
                gender,
                age,
                hypertension,
                heart_disease,
                ever_married,
                work_type,
                residence_type,
                avg_glucose_level,
                bmi,
                smoking_status,
                stroke,
            )| PatientInput {
                gender,
                age,
                hypertension,
                heart_disease,
                ever_married,
                work_type,
                residence_type,
                avg_glucose_level,
                bmi,
                smoking_status,
                stroke,
            },
        )
}

/// A stored patient carrying the validated attributes of `input`.
pub(crate) fn patient_from_input(id: i64, input: &PatientInput) -> Patient {
    let f = input.validate().unwrap();
    Patient {
        id,
        gender: f.gender,
        age: f.age,
        hypertension: f.hypertension,
        heart_disease: f.heart_disease,
        ever_married: f.ever_married,
        work_type: f.work_type,
        residence_type: f.residence_type,
        avg_glucose_level: f.avg_glucose_level,
        bmi: f.bmi,
        smoking_status: f.smoking_status,
        stroke: f.stroke,
        created_at: sample_patient(id).created_at,
    }
}

/// A small stroke dataset in the public Kaggle layout (capitalized
/// `Residence_type`, `N/A` bmi, leading `id` column).
pub(crate) const SAMPLE_CSV: &str = "\
id,gender,age,hypertension,heart_disease,ever_married,work_type,Residence_type,avg_glucose_level,bmi,smoking_status,stroke
9046,Male,67,0,1,Yes,Private,Urban,228.69,36.6,formerly smoked,1
51676,Female,61,0,0,Yes,Self-employed,Rural,202.21,N/A,never smoked,1
31112,Male,80,0,1,Yes,Private,Rural,105.92,32.5,never smoked,1
60182,Female,49,0,0,Yes,Private,Urban,171.23,34.4,smokes,1
1665,Female,79,1,0,Yes,Self-employed,Rural,174.12,24,never smoked,1
56669,Male,81,0,0,Yes,Private,Urban,186.21,29,formerly smoked,1
30669,Male,3,0,0,No,children,Rural,95.12,18,Unknown,0
30468,Male,58,1,0,Yes,Private,Urban,87.96,39.2,never smoked,0
16523,Female,8,0,0,No,Private,Urban,110.89,17.6,Unknown,0
56543,Female,70,0,0,Yes,Private,Rural,69.04,35.9,formerly smoked,0
46136,Male,14,0,0,No,Never_worked,Rural,161.28,19.1,Unknown,0
32257,Female,47,0,0,Yes,Private,Urban,210.95,50.1,Unknown,0
";

/// Hand-weighted model over the dataset's categories.
pub(crate) fn toy_bundle() -> crate::prediction::ModelBundle {
    use crate::prediction::model::{
        LogisticClassifier, ModelBundle, ModelMeta, NumericColumn, OneHotColumn, Preprocessor,
        StrokePipeline,
    };

    let numeric = ["age", "hypertension", "heart_disease", "avg_glucose_level", "bmi"];
    let categorical: [(&str, &[&str]); 5] = [
        ("gender", &["Female", "Male"]),
        ("ever_married", &["No", "Yes"]),
        ("work_type", &["Private", "Self-employed", "children"]),
        ("residence_type", &["Rural", "Urban"]),
        ("smoking_status", &["Unknown", "formerly smoked", "never smoked", "smokes"]),
    ];

    let preprocess = Preprocessor {
        numeric: numeric
            .iter()
            .map(|name| NumericColumn {
                name: name.to_string(),
                fill_value: (*name == "bmi").then_some(28.1),
            })
            .collect(),
        categorical: categorical
            .iter()
            .map(|(name, cats)| OneHotColumn {
                name: name.to_string(),
                categories: cats.iter().map(|c| c.to_string()).collect(),
            })
            .collect(),
    };

    let mut coefficients = vec![0.05, 0.8, 0.7, 0.01, 0.02];
    coefficients.extend(std::iter::repeat(0.1).take(preprocess.width() - numeric.len()));

    ModelBundle {
        pipeline: StrokePipeline {
            preprocess,
            classifier: LogisticClassifier {
                coefficients,
                intercept: -6.0,
            },
        },
        version: Some("toy_v1".into()),
        meta: ModelMeta {
            feature_cols: crate::prediction::FEATURE_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            target_col: "stroke".into(),
            numeric_features: numeric.iter().map(|c| c.to_string()).collect(),
            categorical_features: categorical.iter().map(|(c, _)| c.to_string()).collect(),
        },
    }
}

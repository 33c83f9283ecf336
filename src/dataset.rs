//! Column layout of the stroke CSV dataset, shared by the import and
//! training jobs.
//!
//! Published copies of the dataset spell the residence column
//! `Residence_type`; both spellings resolve to `residence_type`.

use csv::StringRecord;

/// Every column the jobs read, label last.
pub const DATASET_COLUMNS: [&str; 11] = [
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
    "stroke",
];

const RESIDENCE_ALIAS: &str = "Residence_type";

/// Header positions for the known columns of one CSV file.
#[derive(Debug, Clone)]
pub struct ColumnMap {
    positions: Vec<(&'static str, usize)>,
}

impl ColumnMap {
    pub fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let positions = DATASET_COLUMNS
            .iter()
            .filter_map(|&column| {
                let position = match column {
                    "residence_type" => find(column).or_else(|| find(RESIDENCE_ALIAS)),
                    _ => find(column),
                };
                position.map(|p| (column, p))
            })
            .collect();
        Self { positions }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// First dataset column absent from the header, in dataset order.
    pub fn first_missing(&self) -> Option<&'static str> {
        DATASET_COLUMNS.iter().copied().find(|c| !self.contains(c))
    }

    /// Trimmed cell value; `None` when the column is absent.
    pub fn get<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        self.position(column)
            .and_then(|p| record.get(p))
            .map(str::trim)
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.positions
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, p)| *p)
    }
}

/// Missing-value markers the dataset uses in numeric and label columns.
pub fn is_missing(value: &str) -> bool {
    matches!(value.trim(), "" | "N/A" | "NA" | "NaN" | "nan" | "None")
}

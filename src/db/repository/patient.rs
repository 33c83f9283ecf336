use std::str::FromStr;

use rusqlite::{params, Connection, Row};

use super::parse_timestamp;
use crate::db::DatabaseError;
use crate::models::enums::{EverMarried, Gender, ResidenceType};
use crate::models::{Patient, PatientFields, StrokeLabel};

const PATIENT_COLUMNS: &str = "id, gender, age, hypertension, heart_disease, ever_married,
     work_type, residence_type, avg_glucose_level, bmi, smoking_status, stroke, created_at";

/// Insert a patient row and return the id assigned by the store.
pub fn insert_patient(conn: &Connection, fields: &PatientFields) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO patients (gender, age, hypertension, heart_disease, ever_married,
         work_type, residence_type, avg_glucose_level, bmi, smoking_status, stroke)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            fields.gender.as_str(),
            fields.age,
            fields.hypertension as i32,
            fields.heart_disease as i32,
            fields.ever_married.as_str(),
            fields.work_type,
            fields.residence_type.as_str(),
            fields.avg_glucose_level,
            fields.bmi,
            fields.smoking_status,
            fields.stroke.as_db(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> Result<Option<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id], read_row);

    match result {
        Ok(row) => Ok(Some(patient_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Overwrite every attribute of an existing row.
pub fn update_patient(
    conn: &Connection,
    id: i64,
    fields: &PatientFields,
) -> Result<(), DatabaseError> {
    let rows = conn.execute(
        "UPDATE patients SET gender = ?2, age = ?3, hypertension = ?4, heart_disease = ?5,
         ever_married = ?6, work_type = ?7, residence_type = ?8, avg_glucose_level = ?9,
         bmi = ?10, smoking_status = ?11, stroke = ?12
         WHERE id = ?1",
        params![
            id,
            fields.gender.as_str(),
            fields.age,
            fields.hypertension as i32,
            fields.heart_disease as i32,
            fields.ever_married.as_str(),
            fields.work_type,
            fields.residence_type.as_str(),
            fields.avg_glucose_level,
            fields.bmi,
            fields.smoking_status,
            fields.stroke.as_db(),
        ],
    )?;
    if rows == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

pub fn delete_patient(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM patients WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(not_found(id));
    }
    Ok(())
}

/// All patients, oldest id first.
pub fn list_patients(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PATIENT_COLUMNS} FROM patients ORDER BY id ASC"
    ))?;
    let rows = stmt.query_map([], read_row)?;

    let mut patients = Vec::new();
    for row in rows {
        patients.push(patient_from_row(row?)?);
    }
    Ok(patients)
}

pub fn count_patients(conn: &Connection) -> Result<u64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM patients", [], |row| row.get::<_, i64>(0))?;
    Ok(count as u64)
}

pub fn count_stroke_patients(conn: &Connection) -> Result<u64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM patients WHERE stroke = 1",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count as u64)
}

fn not_found(id: i64) -> DatabaseError {
    DatabaseError::NotFound {
        entity_type: "Patient".into(),
        id: id.to_string(),
    }
}

// Internal row type for Patient mapping
struct PatientRow {
    id: i64,
    gender: String,
    age: f64,
    hypertension: i32,
    heart_disease: i32,
    ever_married: String,
    work_type: String,
    residence_type: String,
    avg_glucose_level: f64,
    bmi: Option<f64>,
    smoking_status: Option<String>,
    stroke: Option<i64>,
    created_at: String,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<PatientRow> {
    Ok(PatientRow {
        id: row.get(0)?,
        gender: row.get(1)?,
        age: row.get(2)?,
        hypertension: row.get(3)?,
        heart_disease: row.get(4)?,
        ever_married: row.get(5)?,
        work_type: row.get(6)?,
        residence_type: row.get(7)?,
        avg_glucose_level: row.get(8)?,
        bmi: row.get(9)?,
        smoking_status: row.get(10)?,
        stroke: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn patient_from_row(row: PatientRow) -> Result<Patient, DatabaseError> {
    Ok(Patient {
        id: row.id,
        gender: Gender::from_str(&row.gender)?,
        age: row.age,
        hypertension: row.hypertension != 0,
        heart_disease: row.heart_disease != 0,
        ever_married: EverMarried::from_str(&row.ever_married)?,
        work_type: row.work_type,
        residence_type: ResidenceType::from_str(&row.residence_type)?,
        avg_glucose_level: row.avg_glucose_level,
        bmi: row.bmi,
        smoking_status: row.smoking_status,
        stroke: StrokeLabel::from_db(row.stroke).map_err(|e| DatabaseError::InvalidEnum {
            field: "stroke".into(),
            value: e.0,
        })?,
        created_at: parse_timestamp(&row.created_at)?,
    })
}

//! Patient endpoints.
//!
//! - `GET /api/patients`: all patients, oldest first
//! - `POST /api/patients`: create
//! - `GET /api/patients/:id`: detail with risk prediction
//! - `PUT /api/patients/:id`: overwrite every field
//! - `DELETE /api/patients/:id`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Patient, PatientInput};
use crate::prediction::Prediction;

#[derive(Serialize)]
pub struct PatientListResponse {
    pub patients: Vec<Patient>,
    pub total: usize,
}

/// Patient plus its risk score. A prediction failure never fails the
/// view: `prediction` is null and `prediction_warning` says why.
#[derive(Serialize)]
pub struct PatientDetailResponse {
    pub patient: Patient,
    pub prediction: Option<Prediction>,
    pub prediction_warning: Option<String>,
}

pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<PatientListResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patients = ctx.core.patients().list(&conn)?;
    Ok(Json(PatientListResponse {
        total: patients.len(),
        patients,
    }))
}

pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<PatientInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(input) = payload.map_err(bad_body)?;
    let conn = ctx.core.open_db()?;
    let patient = ctx.core.patients().create(&conn, &input)?;
    Ok((StatusCode::CREATED, Json(patient)))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<PatientDetailResponse>, ApiError> {
    let conn = ctx.core.open_db()?;
    let patient = ctx.core.patients().get(&conn, id)?;

    let (prediction, prediction_warning) = match ctx.core.predictor().predict(&patient) {
        Ok(p) => (Some(p), None),
        Err(e) => {
            tracing::warn!(patient_id = id, error = %e, "Prediction unavailable");
            (None, Some(format!("Prediction unavailable: {e}")))
        }
    };

    Ok(Json(PatientDetailResponse {
        patient,
        prediction,
        prediction_warning,
    }))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
    payload: Result<Json<PatientInput>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let Json(input) = payload.map_err(bad_body)?;
    let conn = ctx.core.open_db()?;
    let patient = ctx.core.patients().update(&conn, id, &input)?;
    Ok(Json(patient))
}

pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.core.open_db()?;
    ctx.core.patients().delete(&conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}

fn bad_body(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(rejection.body_text())
}

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::patients::DashboardStats;

/// `GET /api/dashboard`: total patients and confirmed strokes.
pub async fn summary(State(ctx): State<ApiContext>) -> Result<Json<DashboardStats>, ApiError> {
    let conn = ctx.core.open_db()?;
    let stats = ctx.core.patients().stats(&conn)?;
    Ok(Json(stats))
}

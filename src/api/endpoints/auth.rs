//! Login and logout.
//!
//! `POST /api/auth/login`: Unprotected: exchange credentials for a token
//! `POST /api/auth/logout`: Protected: revoke the presented token

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, UserContext};
use crate::auth::{self, SessionUser};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

pub async fn login(
    State(ctx): State<ApiContext>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    // PBKDF2 is CPU-bound; run it on the blocking pool.
    let core = ctx.core.clone();
    let user = tokio::task::spawn_blocking(move || {
        let conn = core.open_db()?;
        auth::authenticate(&conn, &request.username, &request.password).map_err(ApiError::from)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("login task: {e}")))??;

    let mut sessions = ctx
        .sessions
        .lock()
        .map_err(|_| ApiError::Internal("session lock".into()))?;
    let token = sessions.create(SessionUser {
        user_id: user.id,
        username: user.username.clone(),
    });
    let expires_in = sessions.lifetime().as_secs();

    tracing::info!(user_id = user.id, "Login succeeded");
    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer",
        expires_in,
    }))
}

pub async fn logout(
    State(ctx): State<ApiContext>,
    Extension(user): Extension<UserContext>,
) -> Result<StatusCode, ApiError> {
    ctx.sessions
        .lock()
        .map_err(|_| ApiError::Internal("session lock".into()))?
        .revoke(&user.token);
    tracing::info!(user_id = user.user_id, "Logged out");
    Ok(StatusCode::NO_CONTENT)
}

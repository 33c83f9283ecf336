//! Access logging middleware.
//!
//! Logs every API request with method, path, status and the
//! authenticated user when there is one.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::UserContext;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let user = req
        .extensions()
        .get::<UserContext>()
        .map(|u| u.username.clone());

    let response = next.run(req).await;

    tracing::info!(
        %method,
        path,
        status = response.status().as_u16(),
        user = user.as_deref().unwrap_or("-"),
        "API access"
    );
    response
}

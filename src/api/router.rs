//! API router.
//!
//! Returns a composable `Router` with every route under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Auth validator (protected routes) → 2. Audit logger

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Build the API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

/// Build router from pre-constructed `ApiContext`.
#[cfg(test)]
pub(crate) fn api_router_with_ctx(ctx: ApiContext) -> Router {
    build_router(ctx)
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/dashboard", get(endpoints::dashboard::summary))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route(
            "/patients/:id",
            get(endpoints::patients::detail)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::delete),
        )
        .route("/auth/logout", post(endpoints::auth::logout))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth))
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::auth::password::hash_password_with;
    use crate::config::AppConfig;
    use crate::db::repository::insert_user;
    use crate::mirror::{InMemoryMirrorStore, MirrorStore};
    use crate::test_support::toy_bundle;

    const PASSWORD: &str = "ward-7-rounds";

    struct Harness {
        app: Router,
        ctx: ApiContext,
        mirror: Arc<InMemoryMirrorStore>,
        _dir: tempfile::TempDir,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mirror = Arc::new(InMemoryMirrorStore::new());
        let core = Arc::new(CoreState::new(
            AppConfig::rooted_at(dir.path()),
            mirror.clone(),
        ));
        let conn = core.open_db().unwrap();
        insert_user(&conn, "admin", &hash_password_with(PASSWORD, 1_000)).unwrap();

        let ctx = ApiContext::new(core);
        Harness {
            app: api_router_with_ctx(ctx.clone()),
            ctx,
            mirror,
            _dir: dir,
        }
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("Authorization", format!("Bearer {t}"));
        }
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn login(h: &Harness) -> String {
        let body = serde_json::json!({ "username": "admin", "password": PASSWORD });
        let (status, json) = send(&h.app, request("POST", "/api/auth/login", None, Some(body))).await;
        assert_eq!(status, StatusCode::OK);
        json["token"].as_str().unwrap().to_string()
    }

    fn scenario_patient() -> serde_json::Value {
        serde_json::json!({
            "gender": "Female",
            "age": 67,
            "hypertension": true,
            "heart_disease": false,
            "ever_married": "Yes",
            "work_type": "Private",
            "residence_type": "Urban",
            "avg_glucose_level": 228.69,
            "bmi": 36.6,
            "smoking_status": "formerly smoked",
            "stroke": ""
        })
    }

    #[tokio::test]
    async fn health_is_public() {
        let h = harness();
        let (status, json) = send(&h.app, request("GET", "/api/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model_available"], false);
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        let h = harness();
        for uri in ["/api/patients", "/api/dashboard", "/api/patients/1"] {
            let (status, json) = send(&h.app, request("GET", uri, None, None)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(json["error"]["code"], "AUTH_REQUIRED");
        }
        let (status, _) = send(&h.app, request("GET", "/api/patients", Some("bogus"), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let h = harness();
        let body = serde_json::json!({ "username": "admin", "password": "nope" });
        let (status, json) = send(&h.app, request("POST", "/api/auth/login", None, Some(body))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn login_reports_session_lifetime() {
        let h = harness();
        let body = serde_json::json!({ "username": "admin", "password": PASSWORD });
        let (_, json) = send(&h.app, request("POST", "/api/auth/login", None, Some(body))).await;
        assert_eq!(json["expires_in"], 1800);
        assert_eq!(json["token_type"], "Bearer");
    }

    #[tokio::test]
    async fn create_writes_record_and_mirror_with_null_stroke() {
        let h = harness();
        let token = login(&h).await;

        let (status, json) = send(
            &h.app,
            request("POST", "/api/patients", Some(&token), Some(scenario_patient())),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(json["stroke"].is_null());
        let id = json["id"].as_i64().unwrap();

        let doc = h.mirror.get_by_sql_id(id).unwrap().unwrap();
        assert_eq!(doc.sql_id, id);
        assert_eq!(doc.stroke, crate::models::StrokeLabel::Unknown);
    }

    #[tokio::test]
    async fn invalid_label_is_400() {
        let h = harness();
        let token = login(&h).await;
        let mut body = scenario_patient();
        body["stroke"] = serde_json::json!("2");

        let (status, json) = send(&h.app, request("POST", "/api/patients", Some(&token), Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "INVALID_LABEL");
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let h = harness();
        let token = login(&h).await;
        let mut body = scenario_patient();
        body["gender"] = serde_json::json!("Robot");

        let (status, json) = send(&h.app, request("POST", "/api/patients", Some(&token), Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn detail_without_model_has_null_prediction() {
        let h = harness();
        let token = login(&h).await;
        let (_, created) = send(&h.app, request("POST", "/api/patients", Some(&token), Some(scenario_patient()))).await;
        let uri = format!("/api/patients/{}", created["id"]);

        let (status, json) = send(&h.app, request("GET", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["patient"]["id"], created["id"]);
        assert!(json["prediction"].is_null());
        assert!(json["prediction_warning"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn detail_with_model_has_prediction() {
        let h = harness();
        toy_bundle().save(&h.ctx.core.config.model_path).unwrap();
        let token = login(&h).await;
        let (_, created) = send(&h.app, request("POST", "/api/patients", Some(&token), Some(scenario_patient()))).await;
        let uri = format!("/api/patients/{}", created["id"]);

        let (_, json) = send(&h.app, request("GET", &uri, Some(&token), None)).await;
        let p = json["prediction"]["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p));
        assert_eq!(json["prediction"]["label"], u8::from(p >= 0.5));
        assert_eq!(json["prediction"]["model_version"], "toy_v1");
        assert!(json["prediction_warning"].is_null());
    }

    #[tokio::test]
    async fn update_delete_and_dashboard() {
        let h = harness();
        let token = login(&h).await;
        let (_, created) = send(&h.app, request("POST", "/api/patients", Some(&token), Some(scenario_patient()))).await;
        let id = created["id"].as_i64().unwrap();
        let uri = format!("/api/patients/{id}");

        let mut body = scenario_patient();
        body["stroke"] = serde_json::json!("1");
        body.as_object_mut().unwrap().remove("bmi");
        let (status, updated) = send(&h.app, request("PUT", &uri, Some(&token), Some(body))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["stroke"], 1);
        assert!(updated["bmi"].is_null());

        let (_, stats) = send(&h.app, request("GET", "/api/dashboard", Some(&token), None)).await;
        assert_eq!(stats["total_patients"], 1);
        assert_eq!(stats["stroke_count"], 1);

        let (status, _) = send(&h.app, request("DELETE", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(h.mirror.get_by_sql_id(id).unwrap().is_none());

        let (status, json) = send(&h.app, request("DELETE", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn list_returns_patients_in_id_order() {
        let h = harness();
        let token = login(&h).await;
        for _ in 0..3 {
            send(&h.app, request("POST", "/api/patients", Some(&token), Some(scenario_patient()))).await;
        }
        let (_, json) = send(&h.app, request("GET", "/api/patients", Some(&token), None)).await;
        assert_eq!(json["total"], 3);
        let ids: Vec<i64> = json["patients"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_i64().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn logout_revokes_token() {
        let h = harness();
        let token = login(&h).await;

        let (status, _) = send(&h.app, request("POST", "/api/auth/logout", Some(&token), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&h.app, request("GET", "/api/patients", Some(&token), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(h.ctx.sessions.lock().unwrap().active_count(), 0);
    }
}

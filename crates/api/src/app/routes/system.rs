use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::errors;
use crate::context::AppContext;

/// Admin probes (mounted behind the admin middleware).
pub fn admin_router() -> Router {
    Router::new()
        .route("/api/test", get(test))
        .route("/api/testDb", get(test_db))
        .route("/api/testNotify", get(test_notify))
}

/// 200 with the registry's health, or 503 until the registry is loaded and
/// its latest refresh succeeded.
pub async fn health(Extension(ctx): Extension<Arc<AppContext>>) -> axum::response::Response {
    let health = ctx.registry().health();
    let status = if health.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(serde_json::json!({
            "streamId": ctx.stream().stream_id(),
            "registry": health,
        })),
    )
        .into_response()
}

pub async fn test() -> &'static str {
    "OK"
}

pub async fn test_db(Extension(ctx): Extension<Arc<AppContext>>) -> axum::response::Response {
    match ctx.stream().ping().await {
        Ok(()) => "OK".into_response(),
        Err(e) => errors::stream_error_to_response(e),
    }
}

pub async fn test_notify(Extension(ctx): Extension<Arc<AppContext>>) -> axum::response::Response {
    let Some(publisher) = ctx.stream().publisher() else {
        return errors::json_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "notifications_disabled",
            "no notification bus configured",
        );
    };

    match publisher.probe().await {
        Ok(()) => "OK".into_response(),
        Err(e) => errors::json_error(StatusCode::BAD_GATEWAY, "publish_error", e.to_string()),
    }
}

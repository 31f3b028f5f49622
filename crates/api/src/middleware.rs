use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use crate::app::dto::{AdminParams, OriginParams};
use crate::app::errors;
use crate::context::{AppContext, OriginContext};

/// Delay before answering a failed admin check.
pub const ADMIN_FAILURE_DELAY: Duration = Duration::from_secs(1);

/// Authenticate the calling origin from its `id`/`destId`/`p`/`build` query
/// parameters and attach an [`OriginContext`].
pub async fn origin_auth_middleware(
    State(ctx): State<Arc<AppContext>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let params = Query::<OriginParams>::try_from_uri(req.uri())
        .map(|Query(p)| p)
        .unwrap_or_default();

    let gate_id = params.gate_id().to_string();
    if let Err(e) = ctx.gate().check(&gate_id, &params.p) {
        return errors::auth_error_to_response(e);
    }

    req.extensions_mut().insert(OriginContext::new(
        params.id.clone(),
        gate_id,
        params.build_version(),
    ));

    next.run(req).await
}

/// Require `pass=<API_PASS>` on admin probes.
pub async fn admin_middleware(
    State(ctx): State<Arc<AppContext>>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    if !ctx.admin_enabled() {
        return errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "admin probes are disabled",
        );
    }

    let params = Query::<AdminParams>::try_from_uri(req.uri())
        .map(|Query(p)| p)
        .unwrap_or_default();

    if !ctx.is_admin_pass(&params.pass) {
        tracing::debug!("admin check failed");
        tokio::time::sleep(ADMIN_FAILURE_DELAY).await;
        return errors::json_error(StatusCode::UNAUTHORIZED, "not_authorized", "not authorized");
    }

    next.run(req).await
}

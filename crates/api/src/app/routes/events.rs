//! Event write/read endpoints for authenticated origins.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use originstream_core::EventMessage;

use crate::app::dto::{AddEventResponse, GetEventsParams};
use crate::app::errors;
use crate::context::{AppContext, OriginContext};

pub fn router() -> Router {
    Router::new()
        .route("/api/eventstream/addEvent", post(add_event))
        .route("/api/eventstream/getOriginEvents", get(get_origin_events))
}

/// POST /api/eventstream/addEvent?id=&destId=&p=&build=
///
/// The body is one JSON event message. `originId` and `destinationId` are
/// always taken from the request identity, never from the body.
pub async fn add_event(
    Extension(ctx): Extension<Arc<AppContext>>,
    Extension(origin): Extension<OriginContext>,
    body: Bytes,
) -> axum::response::Response {
    let mut event: EventMessage = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_json", e.to_string()),
    };

    event.origin_id = origin.origin_id().to_string();
    event.destination_id = origin.destination_id().to_string();
    if event.origin_build_version.is_empty() {
        event.origin_build_version = origin.build_version().to_string();
    }

    match ctx.stream().save(event).await {
        Ok(saved) => (
            StatusCode::OK,
            Json(AddEventResponse {
                sequence_id: saved.sequence_id,
            }),
        )
            .into_response(),
        Err(e) => errors::stream_error_to_response(e),
    }
}

/// GET /api/eventstream/getOriginEvents?id=&p=&eventType=&limit=&lastId=&newestId=
///
/// Events filed under `id`, newest first. Page backward by passing the
/// smallest `sequenceId` of the previous page as `lastId`.
pub async fn get_origin_events(
    Extension(ctx): Extension<Arc<AppContext>>,
    Extension(origin): Extension<OriginContext>,
    Query(mut params): Query<GetEventsParams>,
) -> axum::response::Response {
    params.id = origin.destination_id().to_string();

    let query = match params.into_query() {
        Ok(q) => q,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
    };

    match ctx.stream().query(&query).await {
        Ok(events) => (StatusCode::OK, Json(events)).into_response(),
        Err(e) => errors::stream_error_to_response(e),
    }
}

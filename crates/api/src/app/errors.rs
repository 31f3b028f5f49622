use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use originstream_auth::AuthError;
use originstream_infra::StreamError;

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, "not_authorized", err.to_string())
}

pub fn stream_error_to_response(err: StreamError) -> axum::response::Response {
    match err {
        StreamError::Validation(e) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string())
        }
        StreamError::Store(e) => {
            tracing::error!(error = %e, "event store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", e.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use originstream_core::ValidationError;
    use originstream_infra::event_store::EventStoreError;

    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            auth_error_to_response(AuthError::RateLimited).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            stream_error_to_response(ValidationError::missing("eventType").into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            stream_error_to_response(EventStoreError::Timeout(Duration::from_secs(5)).into())
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

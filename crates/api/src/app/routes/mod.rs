use axum::Router;

pub mod events;
pub mod system;

/// Router for all origin-authenticated endpoints.
pub fn router() -> Router {
    events::router()
}

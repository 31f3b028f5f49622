//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: collaborator wiring (origin source, event store, bus)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: query/response DTOs and parameter parsing
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::context::AppContext;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(ctx: Arc<AppContext>) -> Router {
    // Event routes: require an authenticated origin.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        ctx.clone(),
        middleware::origin_auth_middleware,
    ));

    let admin = routes::system::admin_router().layer(axum::middleware::from_fn_with_state(
        ctx.clone(),
        middleware::admin_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .merge(admin)
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(Extension(ctx)),
        )
}

//! Route configuration.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::any;
use tower_http::trace::TraceLayer;

/// Create the application router.
///
/// The deployment endpoint is mounted with `any` so that method and secret
/// checks can answer non-matching requests with a bare 404 instead of a
/// revealing 405.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(&state.config.server.path, any(handlers::receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

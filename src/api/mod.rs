//! HTTP API layer: health and relay introspection endpoints.
//!
//! Introspection endpoints are mounted under `/api/v1`.

pub mod handlers;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete HTTP router (WebSocket route excluded).
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

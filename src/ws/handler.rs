//! Axum WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::WebSocketUpgrade;
use axum::http::{HeaderMap, header};
use axum::response::IntoResponse;

use super::connection::run_connection;
use crate::app_state::AppState;
use crate::error::BrokerError;

/// `GET /ws`: Upgrade HTTP connection to WebSocket.
///
/// # Errors
///
/// Returns [`BrokerError::OriginRejected`] (403) when the request carries
/// an `Origin` outside the configured list.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, BrokerError> {
    let origin = headers.get(header::ORIGIN);
    if !state.allowed_origins.permits(origin) {
        let origin = origin
            .and_then(|o| o.to_str().ok())
            .unwrap_or("<opaque>")
            .to_string();
        tracing::warn!(%origin, "websocket upgrade rejected");
        return Err(BrokerError::OriginRejected(origin));
    }

    let router = Arc::clone(&state.router);
    let capacity = state.outbound_queue_capacity;
    Ok(ws.on_upgrade(move |socket| run_connection(socket, router, capacity)))
}

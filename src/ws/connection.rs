//! WebSocket connection lifecycle.
//!
//! A connection is registered as soon as the upgrade completes and
//! unregistered the moment its read side ends. Inbound frames are routed
//! in arrival order; outbound frames are drained from the connection's
//! queue by a dedicated writer task so a slow socket never stalls the
//! router.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::domain::registry::Frame;
use crate::domain::{ConnectionHandle, ConnectionId, ConnectionRegistry, Envelope, EventRouter};

/// How long a closing connection may spend flushing queued frames.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs one connection from `Open` to `Closed`.
///
/// - Registers the connection with the router's registry.
/// - Routes every decodable text frame; malformed ones are logged and
///   dropped without closing the connection.
/// - Unregisters on close or transport error, then gives the writer a
///   short grace period to flush queued frames and the close reply.
pub async fn run_connection(socket: WebSocket, router: Arc<EventRouter>, capacity: usize) {
    let id = ConnectionId::new();
    let (ws_tx, mut ws_rx) = socket.split();
    let (frame_tx, frame_rx) = mpsc::channel::<Frame>(capacity);

    router
        .registry()
        .register(ConnectionHandle::new(id, frame_tx));
    tracing::info!(
        conn_id = %id,
        connections = router.registry().len(),
        "client connected"
    );

    let mut writer = tokio::spawn(write_loop(id, ws_tx, frame_rx));

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => handle_text(&router, id, text.as_str()),
            Ok(Message::Binary(bytes)) => {
                tracing::debug!(conn_id = %id, len = bytes.len(), "binary frame ignored");
            }
            Ok(Message::Close(frame)) => {
                tracing::debug!(conn_id = %id, ?frame, "close frame received");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(err) => {
                tracing::debug!(conn_id = %id, error = %err, "transport error");
                break;
            }
        }
    }

    // unregistering drops the last queue sender, so the writer drains and
    // flushes the close reply
    router.registry().unregister(id);
    if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }
    tracing::info!(
        conn_id = %id,
        connections = router.registry().len(),
        "client disconnected"
    );
}

/// Decodes and routes one text frame.
fn handle_text(router: &EventRouter, id: ConnectionId, text: &str) {
    match Envelope::decode(text) {
        Ok(envelope) => {
            router.route(id, envelope);
        }
        Err(err) => {
            tracing::warn!(conn_id = %id, error = %err, "dropping malformed envelope");
        }
    }
}

/// Drains queued frames to the socket until either side goes away.
async fn write_loop(
    id: ConnectionId,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut frames: mpsc::Receiver<Frame>,
) {
    while let Some(frame) = frames.recv().await {
        if let Err(err) = ws_tx.send(Message::text(&*frame)).await {
            tracing::debug!(conn_id = %id, error = %err, "write failed; writer stopping");
            return;
        }
    }
    // completes the close handshake, or starts one if the peer went quiet
    if let Err(err) = ws_tx.close().await {
        tracing::debug!(conn_id = %id, error = %err, "close not acknowledged");
    }
}

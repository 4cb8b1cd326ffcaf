//! Connection supervision for the dashboard client.
//!
//! [`supervise`] owns the reconnect state machine and knows nothing about
//! sockets; [`WsSession`] is the tokio-tungstenite transport it drives.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::{HandlerMap, ReconnectPolicy};
use crate::domain::Envelope;
use crate::error::BrokerError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Connection status surfaced to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// A connection attempt is in progress.
    Connecting,
    /// Connected; events are flowing.
    Connected,
    /// Not connected (closed, or waiting to reconnect).
    Disconnected,
    /// The last connection attempt failed.
    Error,
    /// Reconnect attempts exhausted. Terminal: reload required.
    Lost,
}

impl ConnectionStatus {
    /// Returns `true` for the terminal [`ConnectionStatus::Lost`] state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Lost)
    }

    /// Short label for status indicators.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Error => "Error",
            Self::Lost => "Connection lost. Check your network and reload.",
        }
    }
}

/// How one session ended.
#[derive(Debug)]
pub enum SessionEnd {
    /// The client closed the connection on purpose. Never reconnected.
    Closed,
    /// An established connection dropped.
    Dropped,
    /// The connection could not be established.
    Failed(BrokerError),
}

/// One connect-and-serve cycle.
pub trait Session {
    /// Opens a connection and serves it until it ends.
    fn run(&mut self) -> impl Future<Output = SessionEnd> + Send;
}

/// Runs `session` until it is closed on purpose or `policy` is exhausted.
///
/// A dropped connection resets the policy before the next attempt is
/// scheduled, so the first retry after a working session always waits the
/// base delay. Setting `shutdown` during a backoff wait ends supervision
/// immediately.
///
/// # Errors
///
/// Returns [`BrokerError::ReconnectExhausted`] after the last scheduled
/// attempt fails; `status` is left at [`ConnectionStatus::Lost`].
pub async fn supervise<S: Session>(
    session: &mut S,
    mut policy: ReconnectPolicy,
    status: &watch::Sender<ConnectionStatus>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), BrokerError> {
    loop {
        status.send_replace(ConnectionStatus::Connecting);
        match session.run().await {
            SessionEnd::Closed => {
                status.send_replace(ConnectionStatus::Disconnected);
                tracing::info!("connection closed by client");
                return Ok(());
            }
            SessionEnd::Dropped => {
                status.send_replace(ConnectionStatus::Disconnected);
                tracing::warn!("connection to broker lost");
                policy.reset();
            }
            SessionEnd::Failed(err) => {
                status.send_replace(ConnectionStatus::Error);
                tracing::warn!(error = %err, "connection attempt failed");
            }
        }

        let Some(delay) = policy.next_delay() else {
            status.send_replace(ConnectionStatus::Lost);
            tracing::error!(
                attempts = policy.attempts(),
                "max reconnect attempts reached; connection lost, reload required"
            );
            return Err(BrokerError::ReconnectExhausted {
                attempts: policy.attempts(),
            });
        };

        tracing::info!(
            attempt = policy.attempts(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "scheduling reconnect"
        );
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {
                status.send_replace(ConnectionStatus::Disconnected);
                tracing::info!("shutdown requested during backoff");
                return Ok(());
            }
        }
    }
}

/// WebSocket session against the broker.
#[derive(Debug)]
pub struct WsSession {
    url: String,
    handlers: HandlerMap,
    outbound: mpsc::Receiver<Envelope>,
    shutdown: watch::Receiver<bool>,
    status: Arc<watch::Sender<ConnectionStatus>>,
}

impl WsSession {
    /// Creates a session that dispatches inbound events to `handlers` and
    /// sends whatever arrives on `outbound` while connected.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        handlers: HandlerMap,
        outbound: mpsc::Receiver<Envelope>,
        shutdown: watch::Receiver<bool>,
        status: Arc<watch::Sender<ConnectionStatus>>,
    ) -> Self {
        Self {
            url: url.into(),
            handlers,
            outbound,
            shutdown,
            status,
        }
    }

    /// Drops envelopes queued before this connection was established.
    fn discard_stale(&mut self) {
        let mut stale = 0_usize;
        while self.outbound.try_recv().is_ok() {
            stale += 1;
        }
        if stale > 0 {
            tracing::warn!(stale, "discarded envelopes queued while disconnected");
        }
    }
}

impl Session for WsSession {
    async fn run(&mut self) -> SessionEnd {
        if *self.shutdown.borrow() {
            return SessionEnd::Closed;
        }

        tracing::info!(url = %self.url, "connecting to broker");
        let stream = tokio::select! {
            result = tokio_tungstenite::connect_async(self.url.as_str()) => match result {
                Ok((stream, _response)) => stream,
                Err(err) => return SessionEnd::Failed(err.into()),
            },
            _ = self.shutdown.changed() => return SessionEnd::Closed,
        };

        // drain before publishing Connected; sends accepted after this point are kept
        self.discard_stale();
        self.status.send_replace(ConnectionStatus::Connected);
        tracing::info!(url = %self.url, "connected to broker");

        let (mut ws_tx, mut ws_rx) = stream.split();
        for greeting in greetings() {
            if let Err(end) = send_envelope(&mut ws_tx, &greeting).await {
                return end;
            }
        }

        loop {
            tokio::select! {
                msg = ws_rx.next() => match msg {
                    Some(Ok(Message::Text(text))) => dispatch_text(&self.handlers, text.as_str()),
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "broker closed the connection");
                        return SessionEnd::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "connection error");
                        return SessionEnd::Dropped;
                    }
                    None => return SessionEnd::Dropped,
                },
                outbound = self.outbound.recv() => match outbound {
                    Some(envelope) => {
                        if let Err(end) = send_envelope(&mut ws_tx, &envelope).await {
                            return end;
                        }
                    }
                    None => return close(&mut ws_tx).await,
                },
                _ = self.shutdown.changed() => return close(&mut ws_tx).await,
            }
        }
    }
}

/// Envelopes sent right after every successful connection.
fn greetings() -> [Envelope; 2] {
    let now = Utc::now().timestamp_millis();
    [
        Envelope::new(
            "handshake",
            json!({ "clientType": "dashboard", "timestamp": now }),
        ),
        Envelope::new("requestState", json!({ "timestamp": now })),
    ]
}

fn dispatch_text(handlers: &HandlerMap, text: &str) {
    match Envelope::decode(text) {
        Ok(envelope) => {
            tracing::debug!(event = %envelope.event, "event received");
            handlers.dispatch(&envelope);
        }
        Err(err) => tracing::warn!(error = %err, "cannot parse broker message"),
    }
}

async fn send_envelope(ws_tx: &mut WsSink, envelope: &Envelope) -> Result<(), SessionEnd> {
    let text = match envelope.encode() {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(event = %envelope.event, error = %err, "cannot encode envelope");
            return Ok(());
        }
    };
    ws_tx.send(Message::text(text)).await.map_err(|err| {
        tracing::warn!(error = %err, "send failed");
        SessionEnd::Dropped
    })
}

/// Sends a normal close frame and reports an intentional close.
async fn close(ws_tx: &mut WsSink) -> SessionEnd {
    let frame = CloseFrame {
        code: CloseCode::Normal,
        reason: "client disconnect".into(),
    };
    if let Err(err) = ws_tx.send(Message::Close(Some(frame))).await {
        tracing::debug!(error = %err, "close frame not sent");
    }
    SessionEnd::Closed
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;

    /// Session double that fails a fixed number of times, then drops.
    #[derive(Debug, Default)]
    struct ScriptedSession {
        started: Vec<Instant>,
        failures_before_connect: usize,
    }

    impl Session for ScriptedSession {
        async fn run(&mut self) -> SessionEnd {
            self.started.push(Instant::now());
            if self.started.len() <= self.failures_before_connect {
                SessionEnd::Failed(BrokerError::Transport("connection refused".to_string()))
            } else {
                SessionEnd::Closed
            }
        }
    }

    fn gaps(started: &[Instant]) -> Vec<Duration> {
        started
            .iter()
            .zip(started.iter().skip(1))
            .map(|(a, b)| b.duration_since(*a))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let mut session = ScriptedSession {
            failures_before_connect: usize::MAX,
            ..ScriptedSession::default()
        };
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let result = supervise(
            &mut session,
            ReconnectPolicy::new(Duration::from_millis(1000), 5),
            &status_tx,
            shutdown_rx,
        )
        .await;

        let Err(BrokerError::ReconnectExhausted { attempts }) = result else {
            panic!("expected reconnect exhaustion, got {result:?}");
        };
        assert_eq!(attempts, 5);
        // initial attempt plus five reconnects, no sixth
        assert_eq!(session.started.len(), 6);
        let expected = [1000_u64, 2000, 4000, 8000, 16000];
        for (gap, want) in gaps(&session.started).into_iter().zip(expected) {
            assert!(gap >= Duration::from_millis(want), "gap {gap:?} < {want}ms");
            assert!(gap < Duration::from_millis(want + 50), "gap {gap:?} >> {want}ms");
        }
        assert_eq!(*status_rx.borrow(), ConnectionStatus::Lost);
        assert!(status_rx.borrow().is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn intentional_close_is_not_retried() {
        let mut session = ScriptedSession::default();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let result = supervise(
            &mut session,
            ReconnectPolicy::new(Duration::from_millis(1000), 5),
            &status_tx,
            shutdown_rx,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(session.started.len(), 1);
        assert_eq!(*status_rx.borrow(), ConnectionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let mut session = ScriptedSession {
            failures_before_connect: 2,
            ..ScriptedSession::default()
        };
        let (status_tx, _status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let result = supervise(
            &mut session,
            ReconnectPolicy::new(Duration::from_millis(100), 5),
            &status_tx,
            shutdown_rx,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(session.started.len(), 3);
    }

    /// Session that connects, then drops, every time.
    #[derive(Debug, Default)]
    struct FlappingSession {
        started: Vec<Instant>,
    }

    impl Session for FlappingSession {
        async fn run(&mut self) -> SessionEnd {
            self.started.push(Instant::now());
            if self.started.len() > 3 {
                SessionEnd::Closed
            } else {
                SessionEnd::Dropped
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_connection_resets_backoff() {
        let mut session = FlappingSession::default();
        let (status_tx, _status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let result = supervise(
            &mut session,
            ReconnectPolicy::new(Duration::from_millis(1000), 5),
            &status_tx,
            shutdown_rx,
        )
        .await;

        assert!(result.is_ok());
        for gap in gaps(&session.started) {
            assert!(gap >= Duration::from_millis(1000));
            assert!(gap < Duration::from_millis(1050));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_backoff() {
        let mut session = ScriptedSession {
            failures_before_connect: usize::MAX,
            ..ScriptedSession::default()
        };
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let supervisor = supervise(
            &mut session,
            ReconnectPolicy::new(Duration::from_secs(60), 5),
            &status_tx,
            shutdown_rx,
        );
        let stopper = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            shutdown_tx.send_replace(true);
        };
        let (result, ()) = tokio::join!(supervisor, stopper);

        assert!(result.is_ok());
        assert_eq!(session.started.len(), 1);
        assert_eq!(*status_rx.borrow(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn greetings_announce_dashboard() {
        let [handshake, request] = greetings();
        assert_eq!(handshake.event.as_str(), "handshake");
        assert_eq!(handshake.data["clientType"], "dashboard");
        assert_eq!(request.event.as_str(), "requestState");
    }

    #[test]
    fn lost_label_asks_for_reload() {
        assert!(ConnectionStatus::Lost.label().contains("reload"));
        assert!(!ConnectionStatus::Error.is_terminal());
    }
}

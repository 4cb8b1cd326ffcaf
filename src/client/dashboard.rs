//! Dashboard client: one logical broker connection per process.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::session::{ConnectionStatus, WsSession, supervise};
use super::{HandlerMap, ReconnectPolicy};
use crate::config::ClientConfig;
use crate::domain::{Envelope, EventType};
use crate::error::BrokerError;

/// Outbound envelopes buffered while connected.
const OUTBOUND_CAPACITY: usize = 64;

/// Builder for a supervised broker connection.
///
/// ```no_run
/// # async fn demo() {
/// use relay_broker::client::DashboardClient;
/// use relay_broker::config::ClientConfig;
/// use relay_broker::domain::EventType;
///
/// let handle = DashboardClient::new(ClientConfig::from_env())
///     .on(EventType::Attention, |data| println!("attention: {data}"))
///     .spawn();
/// let _ = handle.disconnect().await;
/// # }
/// ```
#[derive(Debug)]
pub struct DashboardClient {
    config: ClientConfig,
    handlers: HandlerMap,
}

impl DashboardClient {
    /// Creates a client with an empty handler map.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            handlers: HandlerMap::new(),
        }
    }

    /// Registers a callback for `event`.
    #[must_use]
    pub fn on(
        mut self,
        event: impl Into<EventType>,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Self {
        self.handlers = self.handlers.on(event, handler);
        self
    }

    /// Starts the connection task and returns its handle.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(self) -> ClientHandle {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let status_tx = Arc::new(status_tx);

        let mut session = WsSession::new(
            self.config.broker_url,
            self.handlers,
            outbound_rx,
            shutdown_rx.clone(),
            Arc::clone(&status_tx),
        );
        let policy = ReconnectPolicy::new(
            self.config.reconnect_base_delay,
            self.config.reconnect_max_attempts,
        );

        let task = tokio::spawn(async move {
            supervise(&mut session, policy, &status_tx, shutdown_rx).await
        });

        ClientHandle {
            outbound: outbound_tx,
            shutdown: shutdown_tx,
            status: status_rx,
            task,
        }
    }
}

/// Handle to a running [`DashboardClient`].
///
/// Dropping the handle closes the connection like
/// [`ClientHandle::disconnect`] but without waiting for it.
#[derive(Debug)]
pub struct ClientHandle {
    outbound: mpsc::Sender<Envelope>,
    shutdown: watch::Sender<bool>,
    status: watch::Receiver<ConnectionStatus>,
    task: JoinHandle<Result<(), BrokerError>>,
}

impl ClientHandle {
    /// Subscribes to connection status changes.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Returns the current connection status.
    #[must_use]
    pub fn current_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Sends `envelope` to the broker.
    ///
    /// Returns `false` and logs a warning if the client is not connected
    /// or its outbound buffer is full. Dropped envelopes are never
    /// replayed.
    pub fn send(&self, envelope: Envelope) -> bool {
        if self.current_status() != ConnectionStatus::Connected {
            tracing::warn!(event = %envelope.event, "not connected; envelope dropped");
            return false;
        }
        match self.outbound.try_send(envelope) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "outbound buffer unavailable; envelope dropped");
                false
            }
        }
    }

    /// Closes the connection on purpose (no reconnect) and waits for the
    /// connection task to finish.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ReconnectExhausted`] if the client had already
    /// given up, or [`BrokerError::Transport`] if the task panicked.
    pub async fn disconnect(self) -> Result<(), BrokerError> {
        self.shutdown.send_replace(true);
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(BrokerError::Transport(format!("client task failed: {err}"))),
        }
    }
}

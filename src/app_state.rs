//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::config::{AllowedOrigins, BrokerConfig};
use crate::domain::{ConnectionTable, EventRouter};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live connection registry.
    pub registry: Arc<ConnectionTable>,
    /// Event router over `registry`.
    pub router: Arc<EventRouter>,
    /// Origins allowed to open a WebSocket.
    pub allowed_origins: Arc<AllowedOrigins>,
    /// Capacity of each connection's outbound queue.
    pub outbound_queue_capacity: usize,
}

impl AppState {
    /// Builds a fresh registry and router from `config`.
    #[must_use]
    pub fn new(config: &BrokerConfig) -> Self {
        let registry = Arc::new(ConnectionTable::new());
        let router = Arc::new(EventRouter::new(
            Arc::clone(&registry),
            config.policies.clone(),
            config.default_player_id.clone(),
        ));
        Self {
            registry,
            router,
            allowed_origins: Arc::new(config.allowed_origins.clone()),
            outbound_queue_capacity: config.outbound_queue_capacity,
        }
    }
}

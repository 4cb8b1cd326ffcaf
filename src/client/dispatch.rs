//! Event type → callback map used by the dashboard client.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::domain::{Envelope, EventType};

type Handler = Box<dyn Fn(&Value) + Send + Sync>;

/// Callbacks keyed by event type, populated once before the client starts.
#[derive(Default)]
pub struct HandlerMap {
    handlers: HashMap<EventType, Handler>,
}

impl HandlerMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `event`, replacing any previous one.
    #[must_use]
    pub fn on(
        mut self,
        event: impl Into<EventType>,
        handler: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(event.into(), Box::new(handler));
        self
    }

    /// Returns `true` if a handler is registered for `event`.
    #[must_use]
    pub fn handles(&self, event: &EventType) -> bool {
        self.handlers.contains_key(event)
    }

    /// Invokes the handler for `envelope.event` with its payload.
    ///
    /// Returns `false` (after logging) if no handler is registered.
    pub fn dispatch(&self, envelope: &Envelope) -> bool {
        match self.handlers.get(&envelope.event) {
            Some(handler) => {
                handler(&envelope.data);
                true
            }
            None => {
                tracing::warn!(event = %envelope.event, "no handler for event; dropped");
                false
            }
        }
    }
}

impl fmt::Debug for HandlerMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut events: Vec<&str> = self.handlers.keys().map(EventType::as_str).collect();
        events.sort_unstable();
        f.debug_struct("HandlerMap").field("events", &events).finish()
    }
}

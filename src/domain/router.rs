//! Event fan-out.
//!
//! [`EventRouter`] takes one inbound `(source, envelope)` pair, looks up the
//! forwarding policy for the event name and queues a single encoded frame
//! on every target's outbound channel. Routing never awaits: a full target
//! queue drops the frame for that target only, and a closed one is pruned
//! from the registry on the spot.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use super::registry::{ConnectionRegistry, ConnectionTable, Delivery, Frame};
use super::{ConnectionId, Envelope, ForwardPolicy, PolicyTable};

/// Per-call delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Policy applied, or `None` if the event name is not registered.
    pub policy: Option<ForwardPolicy>,
    /// Targets whose outbound queue accepted the frame.
    pub delivered: usize,
    /// Targets skipped because their queue was full.
    pub dropped: usize,
    /// Dead targets removed from the registry during fan-out.
    pub pruned: usize,
}

/// Forwards envelopes between registered connections.
#[derive(Debug)]
pub struct EventRouter<R = ConnectionTable> {
    registry: Arc<R>,
    policies: PolicyTable,
    default_player: String,
}

impl<R: ConnectionRegistry> EventRouter<R> {
    /// Creates a router over `registry` using `policies`.
    ///
    /// `default_player` fills a missing `player` field when a
    /// broadcast-all event is normalized.
    #[must_use]
    pub fn new(registry: Arc<R>, policies: PolicyTable, default_player: impl Into<String>) -> Self {
        Self {
            registry,
            policies,
            default_player: default_player.into(),
        }
    }

    /// Returns the registry this router delivers to.
    #[must_use]
    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Returns the policy table.
    #[must_use]
    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Delivers `envelope` from `source` according to its policy.
    pub fn route(&self, source: ConnectionId, envelope: Envelope) -> RouteOutcome {
        let Some(policy) = self.policies.lookup(&envelope.event) else {
            tracing::debug!(
                conn_id = %source,
                event = %envelope.event,
                payload = %envelope.data,
                "unregistered event; not forwarded"
            );
            return RouteOutcome::default();
        };

        tracing::info!(
            conn_id = %source,
            event = %envelope.event,
            %policy,
            payload = %envelope.data,
            "event received"
        );

        let (envelope, targets) = match policy {
            ForwardPolicy::BroadcastOthers => (envelope, self.registry.all_except(source)),
            ForwardPolicy::BroadcastAll => (self.normalize(envelope), self.registry.all()),
        };

        let mut outcome = RouteOutcome {
            policy: Some(policy),
            ..RouteOutcome::default()
        };

        let frame: Frame = match envelope.encode() {
            Ok(text) => Frame::from(text),
            Err(err) => {
                tracing::warn!(conn_id = %source, event = %envelope.event, error = %err, "cannot encode event");
                return outcome;
            }
        };

        for target in targets {
            match target.try_deliver(Arc::clone(&frame)) {
                Delivery::Queued => outcome.delivered += 1,
                Delivery::Full => {
                    outcome.dropped += 1;
                    tracing::warn!(
                        conn_id = %target.id(),
                        event = %envelope.event,
                        "outbound queue full; frame dropped"
                    );
                }
                Delivery::Closed => {
                    self.registry.unregister(target.id());
                    outcome.pruned += 1;
                    tracing::debug!(conn_id = %target.id(), "pruned dead connection");
                }
            }
        }

        tracing::debug!(
            event = %envelope.event,
            delivered = outcome.delivered,
            dropped = outcome.dropped,
            pruned = outcome.pruned,
            "fan-out complete"
        );
        outcome
    }

    /// Fills missing `timestamp` (Unix ms) and, for player-carrying events,
    /// missing `player` fields. Non-object payloads pass through untouched.
    fn normalize(&self, mut envelope: Envelope) -> Envelope {
        let carries_player = envelope.event.carries_player();
        if let Value::Object(fields) = &mut envelope.data {
            if fields.get("timestamp").is_none_or(Value::is_null) {
                fields.insert(
                    "timestamp".to_string(),
                    Value::from(Utc::now().timestamp_millis()),
                );
            }
            if carries_player && fields.get("player").is_none_or(Value::is_null) {
                fields.insert(
                    "player".to_string(),
                    Value::from(self.default_player.as_str()),
                );
            }
        }
        envelope
    }
}

//! Live connection bookkeeping.
//!
//! [`ConnectionRegistry`] is the seam the [`super::EventRouter`] talks to;
//! [`ConnectionTable`] is the concurrent in-memory implementation used by
//! the server. Every read hands out a [`Targets`] snapshot, so the map is
//! never locked while frames are queued.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use super::ConnectionId;

/// Encoded text frame shared across all targets of one fan-out.
pub type Frame = Arc<str>;

/// Result of handing one frame to a connection's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Frame was queued for the writer task.
    Queued,
    /// Outbound queue was full; the frame was dropped for this target.
    Full,
    /// Writer task is gone; the connection is dead.
    Closed,
}

/// Handle held in the registry, used to push frames to one connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Frame>,
}

impl ConnectionHandle {
    /// Creates a handle whose frames are drained from the receiving side of
    /// `tx` by the connection's writer task.
    #[must_use]
    pub fn new(id: ConnectionId, tx: mpsc::Sender<Frame>) -> Self {
        Self { id, tx }
    }

    /// Returns the connection identifier.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Liveness flag: `false` once the writer side has gone away.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Queues `frame` without waiting.
    pub fn try_deliver(&self, frame: Frame) -> Delivery {
        match self.tx.try_send(frame) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Full,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

/// Snapshot of registered connections taken at call time.
///
/// Finite and single-pass: later registry changes are not reflected.
#[derive(Debug)]
pub struct Targets(std::vec::IntoIter<ConnectionHandle>);

impl Iterator for Targets {
    type Item = ConnectionHandle;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for Targets {}

impl From<Vec<ConnectionHandle>> for Targets {
    fn from(handles: Vec<ConnectionHandle>) -> Self {
        Self(handles.into_iter())
    }
}

/// Registry operations the router depends on.
///
/// Implementations must be safe to call from many connection tasks at
/// once; none of the operations can fail.
pub trait ConnectionRegistry: Send + Sync {
    /// Adds a connection. A second registration with the same ID replaces
    /// the first.
    fn register(&self, handle: ConnectionHandle);

    /// Removes a connection. Returns `false` if it was not registered.
    fn unregister(&self, id: ConnectionId) -> bool;

    /// Every live registered connection.
    fn all(&self) -> Targets;

    /// Every live registered connection except `id`.
    fn all_except(&self, id: ConnectionId) -> Targets;

    /// Number of registered connections.
    fn len(&self) -> usize;

    /// Returns `true` if no connection is registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Concurrent `ConnectionId → ConnectionHandle` table.
#[derive(Debug, Default)]
pub struct ConnectionTable {
    connections: DashMap<ConnectionId, ConnectionHandle>,
}

impl ConnectionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn snapshot(&self, skip: Option<ConnectionId>) -> Targets {
        let handles: Vec<ConnectionHandle> = self
            .connections
            .iter()
            .filter(|entry| Some(*entry.key()) != skip && entry.value().is_alive())
            .map(|entry| entry.value().clone())
            .collect();
        Targets::from(handles)
    }
}

impl ConnectionRegistry for ConnectionTable {
    fn register(&self, handle: ConnectionHandle) {
        if let Some(old) = self.connections.insert(handle.id(), handle) {
            tracing::warn!(conn_id = %old.id(), "connection registered twice; replaced");
        }
    }

    fn unregister(&self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }

    fn all(&self) -> Targets {
        self.snapshot(None)
    }

    fn all_except(&self, id: ConnectionId) -> Targets {
        self.snapshot(Some(id))
    }

    fn len(&self) -> usize {
        self.connections.len()
    }
}

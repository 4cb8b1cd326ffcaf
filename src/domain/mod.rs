//! Domain layer: connection identity, envelopes, policies, registry and
//! event routing.
//!
//! This module holds everything the relay needs independent of the
//! transport: the typed event names and their wire envelope, the
//! process-wide policy table, the live connection registry and the router
//! that fans envelopes out to it.

pub mod connection_id;
pub mod envelope;
pub mod event_type;
pub mod policy;
pub mod registry;
pub mod router;

pub use connection_id::ConnectionId;
pub use envelope::Envelope;
pub use event_type::EventType;
pub use policy::{ForwardPolicy, PolicyTable};
pub use registry::{ConnectionHandle, ConnectionRegistry, ConnectionTable};
pub use router::{EventRouter, RouteOutcome};

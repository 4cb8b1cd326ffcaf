//! # relay-broker
//!
//! Real-time event relay for the NeuroRace attention-racing stack.
//!
//! Producers (the headset acquisition service, the game, the gesture
//! detector) and consumers (dashboards) hold one WebSocket each. Every
//! inbound `{type, data}` envelope is fanned out to the other connections
//! according to a per-event forwarding policy. Nothing is persisted,
//! acknowledged or deduplicated.
//!
//! ## Architecture
//!
//! ```text
//! Producers / Dashboards (WebSocket)
//!     │
//!     ├── WS Handler (ws/)           origin check, read/write loops
//!     │
//!     ├── EventRouter (domain/)      policy lookup, normalization, fan-out
//!     ├── PolicyTable (domain/)
//!     │
//!     └── ConnectionTable (domain/)  live connections, per-connection queues
//!
//! DashboardClient (client/)          reconnect with backoff, handler map
//! ```

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod server;
pub mod ws;

//! WebSocket layer: upgrade handling and per-connection read/write loops.
//!
//! The endpoint at `/ws` accepts producers and dashboards alike; every
//! connection may both emit and receive envelopes.

pub mod connection;
pub mod handler;

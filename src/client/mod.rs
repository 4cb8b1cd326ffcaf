//! Dashboard client: a supervised broker connection with a handler map.
//!
//! ```text
//! DashboardClient::spawn
//!     │
//!     ├── supervise()        status, ReconnectPolicy, backoff timer
//!     │      │
//!     │      └── WsSession   connect, greet, dispatch, send, close
//!     │
//!     └── ClientHandle       send(), status(), disconnect()
//! ```

pub mod dashboard;
pub mod dispatch;
pub mod race;
pub mod reconnect;
pub mod session;

pub use dashboard::{ClientHandle, DashboardClient};
pub use dispatch::HandlerMap;
pub use race::RaceSession;
pub use reconnect::ReconnectPolicy;
pub use session::{ConnectionStatus, Session, SessionEnd, WsSession, supervise};

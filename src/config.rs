//! Broker and dashboard configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Everything is read once at startup;
//! there is no hot reload.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;

use crate::domain::PolicyTable;
use crate::error::BrokerError;

/// Front-end origins served during local development.
const DEFAULT_ORIGINS: &str =
    "http://localhost:8080,http://127.0.0.1:8080,http://localhost:5173,http://localhost:8000";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Origins allowed to open a WebSocket or issue cross-origin requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    /// `*`: any origin.
    Any,
    /// Exact origin strings.
    List(Vec<HeaderValue>),
}

impl AllowedOrigins {
    /// Parses a comma-separated origin list. A lone `*` allows any origin.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfig`] if an entry is not a valid
    /// header value.
    pub fn parse(list: &str) -> Result<Self, BrokerError> {
        let entries: Vec<&str> = list
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .collect();
        if entries.contains(&"*") {
            return Ok(Self::Any);
        }
        entries
            .into_iter()
            .map(|origin| {
                HeaderValue::from_str(origin).map_err(|_| {
                    BrokerError::InvalidConfig(format!("invalid origin '{origin}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::List)
    }

    /// Returns `true` if a request with this `Origin` header may proceed.
    ///
    /// Requests without an `Origin` header come from native producers and
    /// are always accepted.
    #[must_use]
    pub fn permits(&self, origin: Option<&HeaderValue>) -> bool {
        match (self, origin) {
            (Self::Any, _) | (_, None) => true,
            (Self::List(allowed), Some(origin)) => allowed.contains(origin),
        }
    }
}

/// Top-level broker configuration.
///
/// Loaded once at startup via [`BrokerConfig::from_env`].
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Socket address to bind the server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Origins allowed for CORS and WebSocket upgrades.
    pub allowed_origins: AllowedOrigins,

    /// Event name → forwarding policy table.
    pub policies: PolicyTable,

    /// Capacity of each connection's outbound frame queue.
    pub outbound_queue_capacity: usize,

    /// Player id written into broadcast-all payloads that lack one.
    pub default_player_id: String,

    /// Log output format.
    pub log_format: LogFormat,
}

impl BrokerConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfig`] if `LISTEN_ADDR`,
    /// `ALLOWED_ORIGINS` or `EVENT_POLICIES` is set but cannot be parsed.
    pub fn from_env() -> Result<Self, BrokerError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`BrokerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, BrokerError> {
        let listen_addr_raw = lookup("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let listen_addr: SocketAddr = listen_addr_raw.parse().map_err(|_| {
            BrokerError::InvalidConfig(format!("LISTEN_ADDR '{listen_addr_raw}' is not host:port"))
        })?;

        let allowed_origins = AllowedOrigins::parse(
            lookup("ALLOWED_ORIGINS")
                .as_deref()
                .unwrap_or(DEFAULT_ORIGINS),
        )?;

        let policies = PolicyTable::default()
            .apply_overrides(lookup("EVENT_POLICIES").as_deref().unwrap_or_default())?;

        let outbound_queue_capacity =
            parse_or(&lookup, "OUTBOUND_QUEUE_CAPACITY", 1024_usize).max(1);

        let default_player_id = lookup("DEFAULT_PLAYER_ID")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "1".to_string());

        let log_format = LogFormat::parse(lookup("LOG_FORMAT").as_deref());

        Ok(Self {
            listen_addr,
            allowed_origins,
            policies,
            outbound_queue_capacity,
            default_player_id,
            log_format,
        })
    }
}

/// Dashboard client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the broker (e.g. `ws://127.0.0.1:3000/ws`).
    pub broker_url: String,

    /// Delay before the first reconnect attempt; doubles per attempt.
    pub reconnect_base_delay: Duration,

    /// Reconnect attempts before the client gives up.
    pub reconnect_max_attempts: u32,

    /// Length of the simulated race played by `relay-emit`.
    pub race_duration: Duration,

    /// Log output format.
    pub log_format: LogFormat,
}

impl ClientConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Values that
    /// fail to parse fall back to their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            broker_url: lookup("BROKER_URL")
                .unwrap_or_else(|| "ws://127.0.0.1:3000/ws".to_string()),
            reconnect_base_delay: Duration::from_millis(parse_or(
                &lookup,
                "RECONNECT_BASE_DELAY_MS",
                1000,
            )),
            reconnect_max_attempts: parse_or(&lookup, "RECONNECT_MAX_ATTEMPTS", 5),
            race_duration: Duration::from_secs(parse_or(&lookup, "RACE_DURATION_SECS", 15)),
            log_format: LogFormat::parse(lookup("LOG_FORMAT").as_deref()),
        }
    }
}

/// Parses `key` as `T`, returning `default` on missing or invalid values.
fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

//! Broker error types with HTTP status code mapping.
//!
//! [`BrokerError`] is the central error type for the broker and the
//! dashboard client. Variants that can reach an HTTP caller map to a
//! status code and a structured JSON error body.

use std::net::SocketAddr;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 1003,
///     "message": "origin not allowed: http://evil.example"
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
}

/// Error enum shared by the broker server and the dashboard client.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status               |
/// |-----------|------------|---------------------------|
/// | 1000–1999 | Protocol   | 400 / 403                 |
/// | 2000–2999 | Transport  | 502 Bad Gateway           |
/// | 3000–3999 | Server     | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    /// Inbound frame was not a valid `{type, data}` envelope.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] serde_json::Error),

    /// WebSocket upgrade carried an `Origin` outside the allowed list.
    #[error("origin not allowed: {0}")]
    OriginRejected(String),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The listening socket could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The client could not open or keep a connection to the broker.
    #[error("transport error: {0}")]
    Transport(String),

    /// The client gave up after exhausting its reconnect budget.
    #[error("connection lost after {attempts} reconnect attempts")]
    ReconnectExhausted {
        /// Number of reconnect attempts that were made.
        attempts: u32,
    },
}

impl BrokerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::MalformedEnvelope(_) => 1001,
            Self::InvalidConfig(_) => 1002,
            Self::OriginRejected(_) => 1003,
            Self::Transport(_) => 2001,
            Self::ReconnectExhausted { .. } => 2002,
            Self::Bind { .. } => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedEnvelope(_) | Self::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Self::OriginRejected(_) => StatusCode::FORBIDDEN,
            Self::Transport(_) | Self::ReconnectExhausted { .. } => StatusCode::BAD_GATEWAY,
            Self::Bind { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for BrokerError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn origin_rejection_is_forbidden() {
        let err = BrokerError::OriginRejected("http://evil.example".to_string());
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_code(), 1003);
        assert!(err.to_string().contains("evil.example"));
    }

    #[test]
    fn into_response_carries_status() {
        let response = BrokerError::InvalidConfig("bad".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn json_error_converts_to_malformed_envelope() {
        let Err(json_err) = serde_json::from_str::<serde_json::Value>("{not json") else {
            panic!("expected a parse error");
        };
        let err = BrokerError::from(json_err);
        assert!(matches!(err, BrokerError::MalformedEnvelope(_)));
    }
}

//! Wire envelope: one named event and its JSON payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EventType;
use crate::error::BrokerError;

/// A single named message exchanged over the persistent channel.
///
/// ```json
/// { "type": "attention", "data": { "player": "1", "attention": 87 } }
/// ```
///
/// Envelopes carry no identity of their own: the broker assigns no ID and
/// never deduplicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name.
    #[serde(rename = "type")]
    pub event: EventType,
    /// Arbitrary JSON payload. Missing on the wire decodes as `null`.
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    /// Creates an envelope for `event` carrying `data`.
    #[must_use]
    pub fn new(event: impl Into<EventType>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Decodes one envelope from a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::MalformedEnvelope`] if `text` is not JSON or
    /// has no string `type` field.
    pub fn decode(text: &str) -> Result<Self, BrokerError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encodes this envelope into a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::MalformedEnvelope`] if the payload cannot be
    /// serialized (non-string map keys and similar).
    pub fn encode(&self) -> Result<String, BrokerError> {
        Ok(serde_json::to_string(self)?)
    }
}

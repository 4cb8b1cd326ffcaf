//! Named event types carried in the envelope `type` field.
//!
//! The core protocol table is a closed set known at compile time. Any
//! other name decodes to [`EventType::Other`] so that newer producers keep
//! working against an older broker.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Event name of a relayed [`super::Envelope`].
///
/// Serializes to and from the exact wire name (case-sensitive), e.g.
/// `"eSense"` or `"raceStarted"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    /// Raw headset reading: `{player, attention, status?, poorSignalLevel?}`.
    ESense,
    /// Blink strength reading.
    Blink,
    /// Hand gesture classification.
    HandGesture,
    /// Smoothed attention sample: `{player, attention, timestamp}`.
    Attention,
    /// Race setup sent by the game before the start.
    RaceConfigure,
    /// Race start signal.
    RaceStarted,
    /// Collision between cars.
    Collision,
    /// Overtake between cars.
    Overtake,
    /// A player (or the whole race) finished.
    HasFinished,
    /// Generic game-state event carrying its own `eventType` field.
    GameEvent,
    /// Any name outside the core protocol table.
    Other(String),
}

impl EventType {
    /// Every event type of the core protocol table.
    pub const KNOWN: [Self; 10] = [
        Self::ESense,
        Self::Blink,
        Self::HandGesture,
        Self::Attention,
        Self::RaceConfigure,
        Self::RaceStarted,
        Self::Collision,
        Self::Overtake,
        Self::HasFinished,
        Self::GameEvent,
    ];

    /// Returns the wire name of this event type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ESense => "eSense",
            Self::Blink => "blink",
            Self::HandGesture => "handGesture",
            Self::Attention => "attention",
            Self::RaceConfigure => "raceConfigure",
            Self::RaceStarted => "raceStarted",
            Self::Collision => "collision",
            Self::Overtake => "overtake",
            Self::HasFinished => "hasFinished",
            Self::GameEvent => "gameEvent",
            Self::Other(name) => name,
        }
    }

    /// Returns `true` for names outside the core protocol table.
    #[must_use]
    pub const fn is_other(&self) -> bool {
        matches!(self, Self::Other(_))
    }

    /// Returns `true` if payloads of this type identify a player.
    #[must_use]
    pub const fn carries_player(&self) -> bool {
        matches!(self, Self::ESense | Self::Attention)
    }
}

impl From<&str> for EventType {
    fn from(name: &str) -> Self {
        match name {
            "eSense" => Self::ESense,
            "blink" => Self::Blink,
            "handGesture" => Self::HandGesture,
            "attention" => Self::Attention,
            "raceConfigure" => Self::RaceConfigure,
            "raceStarted" => Self::RaceStarted,
            "collision" => Self::Collision,
            "overtake" => Self::Overtake,
            "hasFinished" => Self::HasFinished,
            "gameEvent" => Self::GameEvent,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        match Self::from(name.as_str()) {
            Self::Other(_) => Self::Other(name),
            known => known,
        }
    }
}

impl From<EventType> for String {
    fn from(event: EventType) -> Self {
        match event {
            EventType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

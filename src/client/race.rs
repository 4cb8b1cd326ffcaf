//! Scripted race session played by the `relay-emit` producer.
//!
//! A session opens with a `gameEvent` announcing the race and the
//! player-to-user mapping, emits occasional in-race incidents, then one
//! finish event per player and a bare `hasFinished` that closes the
//! session for downstream consumers.

use chrono::Utc;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::domain::{Envelope, EventType};

/// Chance per simulated second that an in-race incident is emitted.
pub const INCIDENT_PROBABILITY: f64 = 0.2;

const PLAYERS: [u8; 2] = [1, 2];
const INCIDENTS: [&str; 2] = ["collision", "overtake"];

/// One simulated race between player 1 and player 2.
#[derive(Debug, Clone)]
pub struct RaceSession {
    session_id: String,
    emails: [String; 2],
}

impl RaceSession {
    /// Creates a session with a fresh id. `emails[0]` belongs to player 1.
    #[must_use]
    pub fn new(emails: [String; 2]) -> Self {
        Self {
            session_id: format!("test-session-{}", Uuid::new_v4()),
            emails,
        }
    }

    /// Returns the session id shared by every envelope.
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// `gameEvent` / `raceStarted` carrying the user mapping.
    #[must_use]
    pub fn start(&self) -> Envelope {
        let users: Vec<Value> = PLAYERS
            .iter()
            .zip(&self.emails)
            .map(|(player, email)| json!({ "playerId": player, "email": email }))
            .collect();
        self.game_event(json!({ "eventType": "raceStarted", "users": users }))
    }

    /// One simulated second: an incident for a random player, or nothing.
    pub fn tick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Envelope> {
        if !rng.random_bool(INCIDENT_PROBABILITY) {
            return None;
        }
        let incident = INCIDENTS.choose(rng)?;
        let player = PLAYERS.choose(rng)?;
        Some(self.game_event(json!({ "eventType": incident, "player": player })))
    }

    /// `gameEvent` / `hasFinished` with the player's race time.
    #[must_use]
    pub fn finish(&self, player: u8, race_time_secs: f64) -> Envelope {
        self.game_event(json!({
            "eventType": "hasFinished",
            "player": player,
            "raceTimeSeconds": race_time_secs,
        }))
    }

    /// Bare `hasFinished` marking the end of data collection.
    #[must_use]
    pub fn end(&self) -> Envelope {
        Envelope::new(
            EventType::HasFinished,
            json!({ "sessionId": self.session_id }),
        )
    }

    fn game_event(&self, mut data: Value) -> Envelope {
        if let Value::Object(fields) = &mut data {
            fields.insert("sessionId".to_string(), Value::from(self.session_id.as_str()));
            fields.insert(
                "timestamp".to_string(),
                Value::from(Utc::now().timestamp_millis()),
            );
        }
        Envelope::new(EventType::GameEvent, data)
    }
}

//! Forwarding policies and the process-wide event type table.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::EventType;
use crate::error::BrokerError;

/// Which connections receive a relayed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForwardPolicy {
    /// Every registered connection except the sender.
    BroadcastOthers,
    /// Every registered connection including the sender. The payload is
    /// normalized first so all observers share one canonical version.
    BroadcastAll,
}

impl ForwardPolicy {
    /// Returns the configuration name of this policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BroadcastOthers => "broadcast-others",
            Self::BroadcastAll => "broadcast-all",
        }
    }
}

impl fmt::Display for ForwardPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForwardPolicy {
    type Err = BrokerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "broadcast-others" => Ok(Self::BroadcastOthers),
            "broadcast-all" => Ok(Self::BroadcastAll),
            other => Err(BrokerError::InvalidConfig(format!(
                "unknown forwarding policy '{other}'"
            ))),
        }
    }
}

/// Mapping from event name to [`ForwardPolicy`].
///
/// Built once at startup and shared read-only. Names without an entry are
/// never forwarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTable {
    policies: HashMap<EventType, ForwardPolicy>,
}

impl PolicyTable {
    /// Creates an empty table that forwards nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            policies: HashMap::new(),
        }
    }

    /// Sets the policy for `event`, replacing any previous entry.
    #[must_use]
    pub fn with(mut self, event: EventType, policy: ForwardPolicy) -> Self {
        self.policies.insert(event, policy);
        self
    }

    /// Returns the policy registered for `event`, if any.
    #[must_use]
    pub fn lookup(&self, event: &EventType) -> Option<ForwardPolicy> {
        self.policies.get(event).copied()
    }

    /// Applies overrides of the form `name=policy,name=policy`.
    ///
    /// Names outside the core table are accepted and become relayable.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfig`] if an entry has no `=` or
    /// names an unknown policy.
    pub fn apply_overrides(mut self, spec: &str) -> Result<Self, BrokerError> {
        for entry in spec.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((name, policy)) = entry.split_once('=') else {
                return Err(BrokerError::InvalidConfig(format!(
                    "event policy entry '{entry}' must be name=policy"
                )));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(BrokerError::InvalidConfig(format!(
                    "event policy entry '{entry}' has an empty name"
                )));
            }
            self.policies.insert(EventType::from(name), policy.parse()?);
        }
        Ok(self)
    }

    /// Returns all entries sorted by event name.
    #[must_use]
    pub fn entries(&self) -> Vec<(EventType, ForwardPolicy)> {
        let mut entries: Vec<_> = self
            .policies
            .iter()
            .map(|(event, policy)| (event.clone(), *policy))
            .collect();
        entries.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));
        entries
    }

    /// Returns the number of registered event names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Returns `true` if no event name is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl Default for PolicyTable {
    /// The core protocol table: `attention` is echoed to everyone, every
    /// other known event goes to everyone but the sender.
    fn default() -> Self {
        EventType::KNOWN
            .into_iter()
            .fold(Self::empty(), |table, event| {
                let policy = match event {
                    EventType::Attention => ForwardPolicy::BroadcastAll,
                    _ => ForwardPolicy::BroadcastOthers,
                };
                table.with(event, policy)
            })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn default_table_covers_core_events() {
        let table = PolicyTable::default();
        assert_eq!(table.len(), EventType::KNOWN.len());
        assert_eq!(
            table.lookup(&EventType::Attention),
            Some(ForwardPolicy::BroadcastAll)
        );
        assert_eq!(
            table.lookup(&EventType::ESense),
            Some(ForwardPolicy::BroadcastOthers)
        );
        assert_eq!(
            table.lookup(&EventType::GameEvent),
            Some(ForwardPolicy::BroadcastOthers)
        );
    }

    #[test]
    fn unknown_event_has_no_policy() {
        let table = PolicyTable::default();
        assert_eq!(table.lookup(&EventType::from("requestState")), None);
    }

    #[test]
    fn overrides_replace_and_extend() {
        let Ok(table) = PolicyTable::default()
            .apply_overrides("attention=broadcast-others, calibration = broadcast-all")
        else {
            panic!("expected valid overrides");
        };
        assert_eq!(
            table.lookup(&EventType::Attention),
            Some(ForwardPolicy::BroadcastOthers)
        );
        assert_eq!(
            table.lookup(&EventType::from("calibration")),
            Some(ForwardPolicy::BroadcastAll)
        );
    }

    #[test]
    fn empty_override_string_is_noop() {
        let Ok(table) = PolicyTable::default().apply_overrides("  ") else {
            panic!("expected empty overrides to be accepted");
        };
        assert_eq!(table, PolicyTable::default());
    }

    #[test]
    fn malformed_overrides_are_rejected() {
        assert!(PolicyTable::empty().apply_overrides("attention").is_err());
        assert!(PolicyTable::empty().apply_overrides("=broadcast-all").is_err());
        assert!(
            PolicyTable::empty()
                .apply_overrides("attention=broadcast-some")
                .is_err()
        );
    }

    #[test]
    fn entries_are_sorted_by_name() {
        let names: Vec<String> = PolicyTable::default()
            .entries()
            .into_iter()
            .map(|(event, _)| event.to_string())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}

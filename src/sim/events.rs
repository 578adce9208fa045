//! Events and the capped event log

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::{CountryCode, Turn};
use crate::sim::diplomacy::{ActionKind, ActionRejected, ActionSource};
use crate::sim::relations::RelationIncident;

/// A logged occurrence
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub turn: Turn,
    /// Primary country
    pub actor: CountryCode,
    /// Counterpart, for events that involve a pair
    #[serde(default)]
    pub secondary: Option<CountryCode>,
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EventKind {
    // Economy
    EconomicShock,
    InvestmentBoom,

    // Relations
    Incident { incident: RelationIncident },

    // Diplomacy
    ActionTaken { source: ActionSource, action: ActionKind },
    ActionFailed { action: ActionKind, reason: ActionRejected },
}

impl Event {
    pub fn new(turn: Turn, actor: CountryCode, secondary: Option<CountryCode>, kind: EventKind) -> Self {
        Self {
            turn,
            actor,
            secondary,
            kind,
        }
    }

    pub fn involves(&self, code: CountryCode) -> bool {
        self.actor == code || self.secondary == Some(code)
    }

    /// Economic shocks raise border tension around the affected country
    pub fn is_shock(&self) -> bool {
        matches!(self.kind, EventKind::EconomicShock)
    }

    /// The action this event records as executed, if any
    pub fn executed_action(&self) -> Option<ActionKind> {
        match self.kind {
            EventKind::ActionTaken { action, .. } => Some(action),
            _ => None,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::EconomicShock => f.write_str("Economic shock"),
            EventKind::InvestmentBoom => f.write_str("Investment boom"),
            EventKind::Incident { incident } => write!(f, "{incident}"),
            EventKind::ActionTaken { source, action } => write!(f, "{source} {action}"),
            EventKind::ActionFailed { action, reason } => write!(f, "Action failed ({action}): {reason}"),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.secondary {
            Some(other) => write!(f, "[T{}] {} / {}: {}", self.turn, self.actor, other, self.kind),
            None => write!(f, "[T{}] {}: {}", self.turn, self.actor, self.kind),
        }
    }
}

/// Most-recent-N event log, oldest first
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: VecDeque<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append events in order, then drop the oldest beyond `cap`
    pub fn extend_capped(&mut self, events: impl IntoIterator<Item = Event>, cap: usize) {
        self.events.extend(events);
        while self.events.len() > cap {
            self.events.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Event> {
        self.events.iter()
    }

    /// Newest first
    pub fn recent(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().rev()
    }

    pub fn events_for_turn(&self, turn: Turn) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.turn == turn)
    }

    pub fn events_for_country(&self, code: CountryCode) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.involves(code))
    }
}

impl FromIterator<Event> for EventLog {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

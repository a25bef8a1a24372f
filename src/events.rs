//! Emitted notifications.
//!
//! Each event is a fact for external observers (indexers, dashboards). Field
//! sets and names are the durable external interface and must stay stable.

use crate::types::{PrincipalId, PrincipalKind, Rule};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Notification emitted by the registries and oracles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    RuleSetUpdated {
        rule_set: Vec<Rule>,
        updater: PrincipalId,
    },
    UserRegistered {
        principal: PrincipalId,
        kind: PrincipalKind,
        rule_set: Vec<Rule>,
    },
    UserLeft {
        principal: PrincipalId,
    },
    RuleAdded {
        rule: Rule,
    },
    RuleRemoved {
        rule: Rule,
    },
}

/// Event delivery port.
///
/// Registries emit through this trait only after their state commit, so a
/// sink never observes an event for a failed operation.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// In-memory append-only event log.
pub struct EventLog {
    events: RwLock<Vec<Event>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of all events emitted so far, in emission order.
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: Event) {
        self.events.write().push(event);
    }
}

/// Sink that drops every event.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: Event) {}
}

//! Alert records and terminal retention

use chrono::{DateTime, Utc};
use protocol::{AlertId, Severity};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Lifecycle state of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    /// Delivered, waiting for an acknowledgement
    Pending,
    /// A worker acknowledged before the window elapsed
    Resolved,
    /// Nobody responded within the window
    Escalated,
}

impl AlertState {
    /// Whether the state admits no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertState::Resolved | AlertState::Escalated)
    }
}

/// One hazard notification instance
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub alert_id: AlertId,
    pub zone: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub acked_by: HashSet<String>,
    pub state: AlertState,
}

impl Alert {
    /// Create a pending alert for a zone
    pub fn new(zone: String, severity: Severity) -> Self {
        Self {
            alert_id: Uuid::new_v4(),
            zone,
            severity,
            created_at: Utc::now(),
            acked_by: HashSet::new(),
            state: AlertState::Pending,
        }
    }
}

/// Bounded FIFO of recently terminal alerts.
///
/// Retained only so late acknowledgements of a known alert still produce
/// an audit record and the admin surface can report a recent outcome.
/// Oldest entries evict first; this is not durable storage.
pub(crate) struct TerminalHistory {
    capacity: usize,
    order: VecDeque<AlertId>,
    entries: HashMap<AlertId, Alert>,
}

impl TerminalHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, alert: Alert) {
        if self.capacity == 0 {
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.entries.remove(&evicted);
            }
        }
        self.order.push_back(alert.alert_id);
        self.entries.insert(alert.alert_id, alert);
    }

    pub fn get(&self, alert_id: &AlertId) -> Option<&Alert> {
        self.entries.get(alert_id)
    }

    pub fn get_mut(&mut self, alert_id: &AlertId) -> Option<&mut Alert> {
        self.entries.get_mut(alert_id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal(zone: &str) -> Alert {
        let mut alert = Alert::new(zone.to_string(), Severity::High);
        alert.state = AlertState::Escalated;
        alert
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AlertState::Pending.is_terminal());
        assert!(AlertState::Resolved.is_terminal());
        assert!(AlertState::Escalated.is_terminal());
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut history = TerminalHistory::new(2);
        let first = terminal("A");
        let first_id = first.alert_id;
        history.push(first);
        history.push(terminal("B"));
        history.push(terminal("C"));

        assert_eq!(history.len(), 2);
        assert!(history.get(&first_id).is_none());
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut history = TerminalHistory::new(0);
        let alert = terminal("A");
        let id = alert.alert_id;
        history.push(alert);
        assert!(history.get(&id).is_none());
    }
}

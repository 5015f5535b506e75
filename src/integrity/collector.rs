//! Append-only store of `IntegrityEvent`s. Writes are serialized per the
//! `EventCollector` they belong to (§5: "write-serialized per session");
//! this type offers no API to mutate or remove a previously recorded event,
//! only to append and to query immutable snapshots of the vector.

use chrono::{DateTime, Utc};

use crate::economy::{HandId, PlayerId, TableId};

use super::events::{IntegrityEvent, IntegrityEventType};

#[derive(Default)]
pub struct EventCollector {
    events: Vec<IntegrityEvent>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: IntegrityEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// All events recorded so far, in arrival order. Detectors and metrics
    /// operate on this owned copy so they never race with further writes.
    pub fn snapshot(&self) -> Vec<IntegrityEvent> {
        self.events.clone()
    }

    pub fn by_hand(&self, table_id: &str, hand_id: HandId) -> Vec<IntegrityEvent> {
        self.events.iter().filter(|e| e.table_id() == table_id && e.hand_id() == Some(hand_id)).cloned().collect()
    }

    pub fn by_player(&self, player_id: &str) -> Vec<IntegrityEvent> {
        self.events.iter().filter(|e| e.involved_players().iter().any(|p| p.as_str() == player_id)).cloned().collect()
    }

    pub fn by_type(&self, event_type: IntegrityEventType) -> Vec<IntegrityEvent> {
        self.events.iter().filter(|e| e.event_type() == event_type).cloned().collect()
    }

    pub fn by_time_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<IntegrityEvent> {
        self.events.iter().filter(|e| e.recorded_at() >= from && e.recorded_at() <= to).cloned().collect()
    }

    pub fn by_table(&self, table_id: &TableId) -> Vec<IntegrityEvent> {
        self.events.iter().filter(|e| e.table_id() == table_id).cloned().collect()
    }
}

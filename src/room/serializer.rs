//! The single writer task for one room's tables. Every state mutation goes
//! through one `Authority` owned exclusively by this task; callers never
//! touch `Room`/`Table` directly, they send a [`SerializerMessage`] and
//! (optionally) listen on the broadcast outbox for the resulting events.
//!
//! Modeled on `ledger::worker::LedgerWorker::run`: an owned `mpsc::Receiver`
//! drained in a loop, one instrumented span per message. The addition here
//! is a periodic tick alongside the receive, used to notice seats that have
//! run out their action clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tracing::instrument;

use crate::clock::Clock;
use crate::config::RuntimeConfig;
use crate::engine::nl::types::SeatId;
use crate::integrity::{EventCollector, WireEventTranslator};
use crate::protocol::event::Event;
use crate::protocol::intent::Intent;
use crate::session::SessionManager;

use super::authority::Authority;

const LOG_TARGET: &str = "poker_room_authority::room::serializer";

pub enum SerializerMessage {
    Intent(Intent),
    PlayerDisconnected { table_id: String, player_id: String },
    PlayerReconnected { table_id: String, player_id: String },
}

pub struct RoomSerializer {
    room_id: String,
    authority: Authority,
    sessions: Arc<parking_lot::Mutex<SessionManager>>,
    receiver: mpsc::Receiver<SerializerMessage>,
    outbox: broadcast::Sender<Event>,
    clock: Arc<dyn Clock>,
    action_timeout_ms: u64,
    tick_interval: Duration,
    last_to_act: HashMap<String, (SeatId, DateTime<Utc>)>,
    integrity: Arc<parking_lot::Mutex<EventCollector>>,
    translator: WireEventTranslator,
}

impl RoomSerializer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        room_id: String,
        authority: Authority,
        sessions: Arc<parking_lot::Mutex<SessionManager>>,
        receiver: mpsc::Receiver<SerializerMessage>,
        outbox: broadcast::Sender<Event>,
        clock: Arc<dyn Clock>,
        config: &RuntimeConfig,
        integrity: Arc<parking_lot::Mutex<EventCollector>>,
    ) -> Self {
        Self {
            room_id,
            authority,
            sessions,
            receiver,
            outbox,
            clock,
            action_timeout_ms: config.room.action_timeout_ms,
            tick_interval: Duration::from_millis(200),
            last_to_act: HashMap::new(),
            integrity,
            translator: WireEventTranslator::new(),
        }
    }

    #[instrument(skip(self), level = "info", target = LOG_TARGET, fields(room_id = %self.room_id))]
    pub async fn run(mut self) {
        tracing::info!(target: LOG_TARGET, room_id = %self.room_id, "serializer started");
        loop {
            tokio::select! {
                biased;
                maybe_message = self.receiver.recv() => {
                    match maybe_message {
                        Some(message) => self.handle_message(message),
                        None => break,
                    }
                }
                _ = tokio::time::sleep(self.tick_interval) => {
                    self.check_action_timeouts();
                }
            }
        }
        tracing::info!(target: LOG_TARGET, room_id = %self.room_id, "receiver closed; serializer exiting");
    }

    fn handle_message(&mut self, message: SerializerMessage) {
        let events = match message {
            SerializerMessage::Intent(intent) => {
                let message_id = intent.header.message_id.clone();
                let mut sessions = self.sessions.lock();
                let events = self.authority.process_intent(intent, &mut sessions);
                tracing::debug!(target: LOG_TARGET, room_id = %self.room_id, message_id, event_count = events.len(), "processed intent");
                events
            }
            SerializerMessage::PlayerDisconnected { table_id, player_id } => {
                tracing::info!(target: LOG_TARGET, room_id = %self.room_id, table_id, player_id, "player disconnected");
                self.authority.mark_seat_disconnected(&table_id, &player_id)
            }
            SerializerMessage::PlayerReconnected { table_id, player_id } => {
                tracing::info!(target: LOG_TARGET, room_id = %self.room_id, table_id, player_id, "player reconnected");
                self.authority.mark_seat_reconnected(&table_id, &player_id)
            }
        };
        self.sync_action_clocks();
        self.publish(events);
    }

    /// Resyncs the per-table "how long has the seat to act been waiting"
    /// clock against whatever `Authority` currently reports. A table whose
    /// seat-to-act changed (new hand, action taken, street advanced) resets
    /// its clock to now; a table with no active hand drops its entry.
    fn sync_action_clocks(&mut self) {
        let now = self.clock.now();
        let table_ids: Vec<String> = self.authority.room.tables.keys().cloned().collect();
        for table_id in table_ids {
            match self.authority.seat_to_act(&table_id) {
                Some(seat) => {
                    let entry = self.last_to_act.entry(table_id).or_insert((seat, now));
                    if entry.0 != seat {
                        *entry = (seat, now);
                    }
                }
                None => {
                    self.last_to_act.remove(&table_id);
                }
            }
        }
    }

    fn check_action_timeouts(&mut self) {
        self.sync_action_clocks();
        let now = self.clock.now();
        let timed_out: Vec<String> = self
            .last_to_act
            .iter()
            .filter(|(_, (_, since))| (now - *since).num_milliseconds().max(0) as u64 >= self.action_timeout_ms)
            .map(|(table_id, _)| table_id.clone())
            .collect();
        for table_id in timed_out {
            let events = self.authority.apply_timeout_action(&table_id);
            self.publish(events);
        }
        self.sync_action_clocks();
    }

    fn publish(&mut self, events: Vec<Event>) {
        let now = self.clock.now();
        for event in events {
            let integrity_events = self.translator.translate(&event, now);
            if !integrity_events.is_empty() {
                let mut collector = self.integrity.lock();
                for integrity_event in integrity_events {
                    collector.record(integrity_event);
                }
            }
            // No active subscribers is routine (e.g. an empty room); the send
            // error just means nobody is listening right now.
            let _ = self.outbox.send(event);
        }
    }
}

//! Composition root. `PokerRuntime` owns the shared session manager, the
//! shared integrity collector, and one `RoomSerializer` task per open room;
//! nothing here is a global — every caller (the diagnostics server, the
//! binary's `main`) is handed an owned `PokerRuntime` and reaches
//! everything else through it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use tokio::sync::{broadcast, mpsc};
use tracing::instrument;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::config::RuntimeConfig;
use crate::integrity::EventCollector;
use crate::moderation::{CaseError, CaseRecord, DecisionLogEntry, ModerationCase, ModeratorService};
use crate::protocol::event::Event;
use crate::protocol::intent::Intent;
use crate::room::card::HandEvaluator;
use crate::room::room::{Room, RoomId};
use crate::room::serializer::SerializerMessage;
use crate::room::{Authority, RoomSerializer};
use crate::session::SessionManager;
use crate::tokio_tools::spawn_named_task;

const LOG_TARGET: &str = "poker_room_authority::runtime";

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("room {0} already exists")]
    RoomAlreadyExists(String),
    #[error("unknown room {0}")]
    UnknownRoom(String),
    #[error("room {0}'s serializer has shut down")]
    RoomGone(String),
    #[error("unknown case {0}")]
    UnknownCase(String),
    #[error(transparent)]
    Case(#[from] CaseError),
}

type CaseDirectory = Arc<parking_lot::Mutex<HashMap<String, CaseRecord>>>;

struct RoomHandle {
    sender: mpsc::Sender<SerializerMessage>,
    outbox: broadcast::Sender<Event>,
    task: tokio::task::JoinHandle<()>,
}

/// Shared by every room's disconnect/reconnect callback so the session
/// manager can route a presence change to the right mailbox without
/// knowing anything about `RoomSerializer` internals.
type RoomDirectory = Arc<parking_lot::Mutex<HashMap<RoomId, RoomHandle>>>;

pub struct PokerRuntime {
    config: RuntimeConfig,
    clock: Arc<dyn Clock>,
    evaluator: Arc<dyn HandEvaluator>,
    sessions: Arc<parking_lot::Mutex<SessionManager>>,
    integrity: Arc<parking_lot::Mutex<EventCollector>>,
    rooms: RoomDirectory,
    cases: CaseDirectory,
}

impl PokerRuntime {
    pub fn new(config: RuntimeConfig, clock: Arc<dyn Clock>, evaluator: Arc<dyn HandEvaluator>) -> Self {
        let mut session_manager = SessionManager::new(config.session_timeouts.clone());
        let rooms: RoomDirectory = Arc::new(parking_lot::Mutex::new(HashMap::new()));

        let disconnect_rooms = Arc::clone(&rooms);
        session_manager.on_disconnect(move |session| route_presence_change(&disconnect_rooms, session, SerializerMessage::PlayerDisconnected {
            table_id: session.current_table.clone().unwrap_or_default(),
            player_id: session.player_id.clone(),
        }));

        let reconnect_rooms = Arc::clone(&rooms);
        session_manager.on_reconnect(move |session| route_presence_change(&reconnect_rooms, session, SerializerMessage::PlayerReconnected {
            table_id: session.current_table.clone().unwrap_or_default(),
            player_id: session.player_id.clone(),
        }));

        session_manager.on_expire(|session| {
            tracing::warn!(target: LOG_TARGET, player_id = %session.player_id, "session expired without reconnecting");
        });

        Self {
            config,
            clock,
            evaluator,
            sessions: Arc::new(parking_lot::Mutex::new(session_manager)),
            integrity: Arc::new(parking_lot::Mutex::new(EventCollector::new())),
            rooms,
            cases: Arc::new(parking_lot::Mutex::new(HashMap::new())),
        }
    }

    pub fn with_system_clock(config: RuntimeConfig, evaluator: Arc<dyn HandEvaluator>) -> Self {
        Self::new(config, Arc::new(SystemClock), evaluator)
    }

    pub fn sessions(&self) -> Arc<parking_lot::Mutex<SessionManager>> {
        Arc::clone(&self.sessions)
    }

    pub fn integrity(&self) -> Arc<parking_lot::Mutex<EventCollector>> {
        Arc::clone(&self.integrity)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Opens a room, spawning its dedicated `RoomSerializer` task. The
    /// caller supplies the already-constructed `Room` (with its tables) so
    /// table layout stays this method's caller's decision, not the
    /// runtime's.
    #[instrument(skip(self, room), fields(room_id = %room.room_id))]
    pub fn open_room(&self, room: Room, rng_seed: u64) -> Result<(), RuntimeError> {
        let room_id = room.room_id.clone();
        let mut rooms = self.rooms.lock();
        if rooms.contains_key(&room_id) {
            return Err(RuntimeError::RoomAlreadyExists(room_id));
        }

        let authority = Authority::new(
            room,
            self.config.clone(),
            Arc::clone(&self.evaluator),
            Arc::clone(&self.clock),
            Box::new(rand::rngs::StdRng::seed_from_u64(rng_seed)),
        );

        let (sender, receiver) = mpsc::channel(256);
        let (outbox, _unused_rx) = broadcast::channel(1024);
        let serializer = RoomSerializer::new(
            room_id.clone(),
            authority,
            Arc::clone(&self.sessions),
            receiver,
            outbox.clone(),
            Arc::clone(&self.clock),
            &self.config,
            Arc::clone(&self.integrity),
        );

        let task = spawn_named_task(format!("room-serializer-{room_id}"), serializer.run());
        rooms.insert(room_id.clone(), RoomHandle { sender, outbox, task });
        tracing::info!(target: LOG_TARGET, room_id = %room_id, "room opened");
        Ok(())
    }

    /// Drops the room's mailbox sender, which makes the serializer's
    /// `receiver.recv()` return `None` and its run loop exit on its own,
    /// then waits for that exit so the caller knows the task is gone.
    pub async fn close_room(&self, room_id: &str) -> Result<(), RuntimeError> {
        let handle = self.rooms.lock().remove(room_id).ok_or_else(|| RuntimeError::UnknownRoom(room_id.to_string()))?;
        drop(handle.sender);
        let _ = handle.task.await;
        Ok(())
    }

    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.lock().keys().cloned().collect()
    }

    /// Hands an intent to its room's serializer mailbox. The room is taken
    /// from `table_context`/`RequestSync`/etc at the intent layer upstream
    /// of this call; here the caller already knows which room a session
    /// belongs to (typically from `Session::current_room`).
    pub async fn dispatch(&self, room_id: &str, intent: Intent) -> Result<(), RuntimeError> {
        let sender = {
            let rooms = self.rooms.lock();
            rooms.get(room_id).map(|handle| handle.sender.clone()).ok_or_else(|| RuntimeError::UnknownRoom(room_id.to_string()))?
        };
        sender.send(SerializerMessage::Intent(intent)).await.map_err(|_| RuntimeError::RoomGone(room_id.to_string()))
    }

    pub fn subscribe(&self, room_id: &str) -> Result<broadcast::Receiver<Event>, RuntimeError> {
        let rooms = self.rooms.lock();
        let handle = rooms.get(room_id).ok_or_else(|| RuntimeError::UnknownRoom(room_id.to_string()))?;
        Ok(handle.outbox.subscribe())
    }

    /// Opens a moderation case, returning its generated id. A case lives in
    /// the runtime's own registry, never inside a room's serializer, since a
    /// case must survive a room closing and outlive any single table.
    pub fn open_case(&self, table_id: String, opened_reason: String) -> String {
        let case_id = Uuid::new_v4().to_string();
        let record = ModeratorService::open_case(case_id.clone(), table_id, opened_reason, self.clock.now());
        self.cases.lock().insert(case_id.clone(), record);
        case_id
    }

    pub fn case_ids(&self) -> Vec<String> {
        self.cases.lock().keys().cloned().collect()
    }

    pub fn case_snapshot(&self, case_id: &str) -> Option<ModerationCase> {
        self.cases.lock().get(case_id).map(|record| record.case.clone())
    }

    pub fn case_log(&self, case_id: &str) -> Option<Vec<DecisionLogEntry>> {
        self.cases.lock().get(case_id).map(|record| record.log.entries().to_vec())
    }

    /// Applies a `ModeratorService` transition to an owned case by id. The
    /// closure is handed the case's full record (so it can also consult
    /// replay/evidence data logged via `view_replay`/`view_bundle`) under the
    /// registry's lock; cases evolve one at a time, independently of each
    /// other, matching "moderation service is single-writer per case".
    fn mutate_case<F>(&self, case_id: &str, f: F) -> Result<(), RuntimeError>
    where
        F: FnOnce(&mut CaseRecord, DateTime<Utc>) -> Result<(), CaseError>,
    {
        let mut cases = self.cases.lock();
        let record = cases.get_mut(case_id).ok_or_else(|| RuntimeError::UnknownCase(case_id.to_string()))?;
        f(record, self.clock.now()).map_err(RuntimeError::from)
    }

    pub fn assign_case(&self, case_id: &str, moderator_id: &str) -> Result<(), RuntimeError> {
        self.mutate_case(case_id, |record, now| ModeratorService::assign(record, moderator_id, now))
    }

    pub fn annotate_case(&self, case_id: &str, moderator_id: &str, note: &str) -> Result<(), RuntimeError> {
        self.mutate_case(case_id, |record, now| ModeratorService::annotate(record, moderator_id, note, now))
    }

    pub fn recommend_case(&self, case_id: &str, moderator_id: &str, recommendation: &str) -> Result<(), RuntimeError> {
        self.mutate_case(case_id, |record, now| ModeratorService::recommend(record, moderator_id, recommendation, now))
    }

    pub fn decide_case(
        &self,
        case_id: &str,
        moderator_id: &str,
        decision: crate::moderation::CaseDecision,
        details: &str,
    ) -> Result<(), RuntimeError> {
        self.mutate_case(case_id, |record, now| ModeratorService::decide(record, moderator_id, decision, details, now))
    }

    pub fn reopen_case(&self, case_id: &str, moderator_id: &str, reason: &str) -> Result<(), RuntimeError> {
        self.mutate_case(case_id, |record, now| ModeratorService::reopen(record, moderator_id, reason, now))
    }
}

fn route_presence_change(rooms: &RoomDirectory, session: &crate::session::Session, message: SerializerMessage) {
    let Some(room_id) = session.current_room.clone() else { return };
    let sender = {
        let rooms = rooms.lock();
        rooms.get(&room_id).map(|handle| handle.sender.clone())
    };
    let Some(sender) = sender else {
        tracing::warn!(target: LOG_TARGET, room_id, player_id = %session.player_id, "presence callback fired for a room with no active serializer");
        return;
    };
    if let Err(err) = sender.try_send(message) {
        tracing::warn!(target: LOG_TARGET, room_id, player_id = %session.player_id, %err, "dropped presence callback; mailbox full or closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::room::card::HighCardSumEvaluator;
    use crate::room::room::Room;
    use crate::room::table::Table;
    use chrono::Utc;

    fn runtime() -> PokerRuntime {
        PokerRuntime::new(RuntimeConfig::default(), Arc::new(FixedClock::new(Utc::now())), Arc::new(HighCardSumEvaluator))
    }

    #[tokio::test]
    async fn opening_the_same_room_twice_is_rejected() {
        let runtime = runtime();
        let mut room = Room::new("r1", runtime.config().room.clone());
        room.add_table(Table::new("t1", 2));
        runtime.open_room(room, 1).unwrap();

        let mut duplicate = Room::new("r1", runtime.config().room.clone());
        duplicate.add_table(Table::new("t1", 2));
        assert!(matches!(runtime.open_room(duplicate, 2), Err(RuntimeError::RoomAlreadyExists(_))));
    }

    #[tokio::test]
    async fn dispatching_to_an_unopened_room_fails_without_panicking() {
        let runtime = runtime();
        let intent = crate::protocol::intent::Intent {
            session_id: "s1".to_string(),
            header: crate::protocol::intent::IntentHeader { message_id: "m1".to_string(), sequence: 1, timestamp_ms: 0 },
            body: crate::protocol::intent::IntentBody::Heartbeat { client_time_ms: 0 },
        };
        let result = runtime.dispatch("ghost-room", intent).await;
        assert!(matches!(result, Err(RuntimeError::UnknownRoom(_))));
    }

    #[tokio::test]
    async fn closing_an_open_room_removes_it_from_the_directory() {
        let runtime = runtime();
        let mut room = Room::new("r1", runtime.config().room.clone());
        room.add_table(Table::new("t1", 2));
        runtime.open_room(room, 1).unwrap();
        assert_eq!(runtime.room_ids(), vec!["r1".to_string()]);
        runtime.close_room("r1").await.unwrap();
        assert!(runtime.room_ids().is_empty());
    }

    #[tokio::test]
    async fn a_case_opened_through_the_runtime_can_be_assigned_and_read_back() {
        let runtime = runtime();
        let case_id = runtime.open_case("t1".to_string(), "risk score 80".to_string());
        assert_eq!(runtime.case_ids(), vec![case_id.clone()]);

        runtime.assign_case(&case_id, "mod1").unwrap();
        let snapshot = runtime.case_snapshot(&case_id).unwrap();
        assert_eq!(snapshot.status, crate::moderation::CaseStatus::UnderInvestigation);
        assert_eq!(runtime.case_log(&case_id).unwrap().len(), 2);

        assert!(matches!(runtime.assign_case("ghost-case", "mod1"), Err(RuntimeError::UnknownCase(_))));
    }
}

//! Deterministic hand replay from an event stream: an ordered sequence of
//! state/action/diff steps plus a checksum over the whole sequence. Two
//! calls over the same slice of events for the same `hand_id` produce
//! bit-identical output, including the checksum.

use serde::{Deserialize, Serialize};

use crate::economy::{HandId, PlayerId, TableId};
use crate::engine::nl::types::Chips;
use crate::integrity::{IntegrityEvent, RecordedAction};

use super::hash::{hash_replay, hash_state, write_str, write_u64};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerHandState {
    pub player_id: PlayerId,
    pub committed: Chips,
    pub folded: bool,
}

/// A table's hand state at one point in the replay. `players` is always
/// kept sorted by `player_id` so the state hash is stable regardless of
/// the order seats were iterated in when the state was built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandState {
    pub pot: Chips,
    pub players: Vec<PlayerHandState>,
}

impl HandState {
    fn empty(player_ids: &[PlayerId]) -> Self {
        let mut players: Vec<PlayerHandState> =
            player_ids.iter().map(|p| PlayerHandState { player_id: p.clone(), committed: 0, folded: false }).collect();
        players.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        Self { pot: 0, players }
    }

    fn apply_action(&mut self, player_id: &str, action: RecordedAction, amount: Chips) {
        if let Some(player) = self.players.iter_mut().find(|p| p.player_id == player_id) {
            if action == RecordedAction::Fold {
                player.folded = true;
            } else {
                player.committed += amount;
                self.pot += amount;
            }
        }
    }

    fn state_hash(&self) -> String {
        let mut buf = Vec::new();
        write_u64(&mut buf, self.pot);
        write_u64(&mut buf, self.players.len() as u64);
        for player in &self.players {
            write_str(&mut buf, &player.player_id);
            write_u64(&mut buf, player.committed);
            buf.push(player.folded as u8);
        }
        hash_state(&buf)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayStep {
    pub state: HandState,
    pub action: Option<RecordedAction>,
    pub source_event: IntegrityEvent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandWinnerRecord {
    pub player_id: PlayerId,
    pub amount: Chips,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandReplay {
    pub table_id: TableId,
    pub hand_id: HandId,
    pub initial_state: HandState,
    pub steps: Vec<ReplayStep>,
    pub final_state: HandState,
    pub winners: Vec<HandWinnerRecord>,
    pub total_pot_awarded: Chips,
    pub duration_ms: i64,
    pub checksum: String,
}

fn action_tag(action: RecordedAction) -> &'static str {
    match action {
        RecordedAction::Fold => "fold",
        RecordedAction::Check => "check",
        RecordedAction::Call => "call",
        RecordedAction::Bet => "bet",
        RecordedAction::Raise => "raise",
        RecordedAction::AllIn => "all_in",
    }
}

fn compute_checksum(hand_id: HandId, steps: &[ReplayStep]) -> String {
    let mut buf = Vec::new();
    write_u64(&mut buf, hand_id);
    write_u64(&mut buf, steps.len() as u64);
    for step in steps {
        match step.action {
            Some(action) => write_str(&mut buf, action_tag(action)),
            None => write_str(&mut buf, "none"),
        }
        write_str(&mut buf, &step.state.state_hash());
    }
    hash_replay(&buf)
}

pub struct HandReplayEngine;

impl HandReplayEngine {
    /// Builds the replay for `hand_id` on `table_id` from a (possibly
    /// multi-table, multi-hand) event stream; events for other hands are
    /// ignored.
    pub fn replay(events: &[IntegrityEvent], table_id: &str, hand_id: HandId) -> Option<HandReplay> {
        let hand_events: Vec<&IntegrityEvent> =
            events.iter().filter(|e| e.table_id() == table_id && e.hand_id() == Some(hand_id)).collect();
        let started = hand_events.iter().find_map(|e| match e {
            IntegrityEvent::HandStarted { players, recorded_at, .. } => Some((players.clone(), *recorded_at)),
            _ => None,
        })?;
        let (players, started_at) = started;

        let mut state = HandState::empty(&players);
        let mut steps = Vec::new();
        let mut ended_at = started_at;

        for event in &hand_events {
            match event {
                IntegrityEvent::ActionTaken { player_id, action, amount, recorded_at, .. } => {
                    state.apply_action(player_id, *action, *amount);
                    ended_at = *recorded_at;
                    steps.push(ReplayStep { state: state.clone(), action: Some(*action), source_event: (*event).clone() });
                }
                IntegrityEvent::StreetAdvanced { recorded_at, .. } => {
                    ended_at = *recorded_at;
                    steps.push(ReplayStep { state: state.clone(), action: None, source_event: (*event).clone() });
                }
                IntegrityEvent::PotAwarded { recorded_at, .. } => {
                    ended_at = *recorded_at;
                    steps.push(ReplayStep { state: state.clone(), action: None, source_event: (*event).clone() });
                }
                _ => {}
            }
        }

        let winners: Vec<HandWinnerRecord> = hand_events
            .iter()
            .filter_map(|e| match e {
                IntegrityEvent::PotAwarded { winner, amount, .. } => Some(HandWinnerRecord { player_id: winner.clone(), amount: *amount }),
                _ => None,
            })
            .collect();
        let total_pot_awarded: Chips = winners.iter().map(|w| w.amount).sum();

        let initial_state = HandState::empty(&players);
        let checksum = compute_checksum(hand_id, &steps);

        Some(HandReplay {
            table_id: table_id.to_string(),
            hand_id,
            initial_state,
            final_state: state,
            steps,
            winners,
            total_pot_awarded,
            duration_ms: (ended_at - started_at).num_milliseconds().max(0),
            checksum,
        })
    }

    pub fn verify_replay_determinism(replay: &HandReplay) -> bool {
        compute_checksum(replay.hand_id, &replay.steps) == replay.checksum
    }
}

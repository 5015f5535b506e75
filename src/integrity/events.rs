//! The integrity event stream's wire shape: a tagged variant per event type
//! instead of the free-form payload the source system carried. Everything
//! downstream (metrics, detectors, risk reports) is a pure function over a
//! `Vec<IntegrityEvent>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::economy::{HandId, PlayerId, TableId};
use crate::engine::nl::types::{Chips, SeatId, Street};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityEventType {
    HandStarted,
    ActionTaken,
    StreetAdvanced,
    PotAwarded,
    PlayerTimedOut,
    PlayerDisconnected,
    PlayerReconnected,
    AuthorityIntervention,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedAction {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

/// One immutable fact about a table. Every variant's tag matches an
/// `IntegrityEventType`; `event_type()` recovers it without a match arm per
/// caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IntegrityEvent {
    HandStarted {
        table_id: TableId,
        hand_id: HandId,
        players: Vec<PlayerId>,
        dealer_seat: SeatId,
        recorded_at: DateTime<Utc>,
    },
    ActionTaken {
        table_id: TableId,
        hand_id: HandId,
        player_id: PlayerId,
        seat: SeatId,
        street: Street,
        action: RecordedAction,
        amount: Chips,
        time_to_act_ms: u64,
        facing_bet: bool,
        is_heads_up: bool,
        recorded_at: DateTime<Utc>,
    },
    StreetAdvanced {
        table_id: TableId,
        hand_id: HandId,
        street: Street,
        recorded_at: DateTime<Utc>,
    },
    PotAwarded {
        table_id: TableId,
        hand_id: HandId,
        winner: PlayerId,
        amount: Chips,
        contributors: Vec<PlayerId>,
        went_to_showdown: bool,
        recorded_at: DateTime<Utc>,
    },
    PlayerTimedOut {
        table_id: TableId,
        hand_id: HandId,
        player_id: PlayerId,
        recorded_at: DateTime<Utc>,
    },
    PlayerDisconnected {
        table_id: TableId,
        player_id: PlayerId,
        recorded_at: DateTime<Utc>,
    },
    PlayerReconnected {
        table_id: TableId,
        player_id: PlayerId,
        recorded_at: DateTime<Utc>,
    },
    AuthorityIntervention {
        table_id: TableId,
        actor: PlayerId,
        description: String,
        affected_player: Option<PlayerId>,
        recorded_at: DateTime<Utc>,
    },
}

impl IntegrityEvent {
    pub fn event_type(&self) -> IntegrityEventType {
        match self {
            IntegrityEvent::HandStarted { .. } => IntegrityEventType::HandStarted,
            IntegrityEvent::ActionTaken { .. } => IntegrityEventType::ActionTaken,
            IntegrityEvent::StreetAdvanced { .. } => IntegrityEventType::StreetAdvanced,
            IntegrityEvent::PotAwarded { .. } => IntegrityEventType::PotAwarded,
            IntegrityEvent::PlayerTimedOut { .. } => IntegrityEventType::PlayerTimedOut,
            IntegrityEvent::PlayerDisconnected { .. } => IntegrityEventType::PlayerDisconnected,
            IntegrityEvent::PlayerReconnected { .. } => IntegrityEventType::PlayerReconnected,
            IntegrityEvent::AuthorityIntervention { .. } => IntegrityEventType::AuthorityIntervention,
        }
    }

    pub fn table_id(&self) -> &str {
        match self {
            IntegrityEvent::HandStarted { table_id, .. }
            | IntegrityEvent::ActionTaken { table_id, .. }
            | IntegrityEvent::StreetAdvanced { table_id, .. }
            | IntegrityEvent::PotAwarded { table_id, .. }
            | IntegrityEvent::PlayerTimedOut { table_id, .. }
            | IntegrityEvent::PlayerDisconnected { table_id, .. }
            | IntegrityEvent::PlayerReconnected { table_id, .. }
            | IntegrityEvent::AuthorityIntervention { table_id, .. } => table_id,
        }
    }

    pub fn hand_id(&self) -> Option<HandId> {
        match self {
            IntegrityEvent::HandStarted { hand_id, .. }
            | IntegrityEvent::ActionTaken { hand_id, .. }
            | IntegrityEvent::StreetAdvanced { hand_id, .. }
            | IntegrityEvent::PotAwarded { hand_id, .. }
            | IntegrityEvent::PlayerTimedOut { hand_id, .. } => Some(*hand_id),
            _ => None,
        }
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        match self {
            IntegrityEvent::HandStarted { recorded_at, .. }
            | IntegrityEvent::ActionTaken { recorded_at, .. }
            | IntegrityEvent::StreetAdvanced { recorded_at, .. }
            | IntegrityEvent::PotAwarded { recorded_at, .. }
            | IntegrityEvent::PlayerTimedOut { recorded_at, .. }
            | IntegrityEvent::PlayerDisconnected { recorded_at, .. }
            | IntegrityEvent::PlayerReconnected { recorded_at, .. }
            | IntegrityEvent::AuthorityIntervention { recorded_at, .. } => *recorded_at,
        }
    }

    /// Players with a direct stake in this event, used by detectors to
    /// index events per player without a second match per caller.
    pub fn involved_players(&self) -> Vec<PlayerId> {
        match self {
            IntegrityEvent::HandStarted { players, .. } => players.clone(),
            IntegrityEvent::ActionTaken { player_id, .. } => vec![player_id.clone()],
            IntegrityEvent::StreetAdvanced { .. } => Vec::new(),
            IntegrityEvent::PotAwarded { winner, contributors, .. } => {
                let mut players = contributors.clone();
                if !players.contains(winner) {
                    players.push(winner.clone());
                }
                players
            }
            IntegrityEvent::PlayerTimedOut { player_id, .. }
            | IntegrityEvent::PlayerDisconnected { player_id, .. }
            | IntegrityEvent::PlayerReconnected { player_id, .. } => vec![player_id.clone()],
            IntegrityEvent::AuthorityIntervention { actor, affected_player, .. } => {
                let mut players = vec![actor.clone()];
                players.extend(affected_player.clone());
                players
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_the_serialized_tag() {
        let event = IntegrityEvent::PlayerTimedOut {
            table_id: "t1".to_string(),
            hand_id: 1,
            player_id: "p1".to_string(),
            recorded_at: Utc::now(),
        };
        assert_eq!(event.event_type(), IntegrityEventType::PlayerTimedOut);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "player_timed_out");
    }

    #[test]
    fn pot_awarded_involved_players_includes_winner_once() {
        let event = IntegrityEvent::PotAwarded {
            table_id: "t1".to_string(),
            hand_id: 1,
            winner: "p1".to_string(),
            amount: 100,
            contributors: vec!["p1".to_string(), "p2".to_string()],
            went_to_showdown: true,
            recorded_at: Utc::now(),
        };
        let players = event.involved_players();
        assert_eq!(players.iter().filter(|p| p.as_str() == "p1").count(), 1);
    }
}

use serde::{Deserialize, Serialize};

use super::error::RejectCode;
use super::intent::{HandId, PlayerActionRequest, RoomId, SeatId, TableId};
use crate::engine::nl::types::{Chips, Street};
use crate::sync::diff::DiffOp;
use crate::sync::snapshot::RoomSnapshot;

pub type PlayerId = String;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandEndReason {
    Showdown,
    AllFolded,
    AllInRunout,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandWinner {
    pub player_id: PlayerId,
    pub amount: Chips,
    pub hand_description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    Ack {
        intent_message_id: String,
    },
    Reject {
        intent_message_id: String,
        code: RejectCode,
        reason: String,
        details: Option<String>,
    },
    RoomJoined {
        room_id: RoomId,
        player_id: PlayerId,
    },
    RoomLeft {
        room_id: RoomId,
        player_id: PlayerId,
    },
    PlayerJoined {
        room_id: RoomId,
        player_id: PlayerId,
    },
    PlayerLeft {
        room_id: RoomId,
        player_id: PlayerId,
    },
    SeatTaken {
        table_id: TableId,
        seat_index: SeatId,
        player_id: PlayerId,
    },
    SeatVacated {
        table_id: TableId,
        seat_index: SeatId,
    },
    PlayerSatOut {
        table_id: TableId,
        seat_index: SeatId,
    },
    PlayerSatBack {
        table_id: TableId,
        seat_index: SeatId,
    },
    HandStarted {
        table_id: TableId,
        hand_number: HandId,
        dealer_seat: SeatId,
        sb_seat: SeatId,
        bb_seat: SeatId,
        players: Vec<PlayerId>,
    },
    ActionPerformed {
        table_id: TableId,
        player_id: PlayerId,
        seat_index: SeatId,
        action: PlayerActionRequest,
        new_stack: Chips,
        pot_total: Chips,
    },
    StreetChanged {
        table_id: TableId,
        street: Street,
        community_cards: Vec<String>,
    },
    PotUpdated {
        table_id: TableId,
        pot_total: Chips,
    },
    HandEnded {
        table_id: TableId,
        winners: Vec<HandWinner>,
        end_reason: HandEndReason,
    },
    PlayerDisconnected {
        table_id: TableId,
        player_id: PlayerId,
        grace_seconds_remaining: u64,
    },
    PlayerReconnected {
        table_id: TableId,
        player_id: PlayerId,
    },
    PlayerTimedOut {
        table_id: TableId,
        player_id: PlayerId,
    },
    Snapshot {
        snapshot: RoomSnapshot,
        for_player_id: PlayerId,
    },
    Diff {
        base_sequence: u64,
        operations: Vec<DiffOp>,
    },
    HeartbeatAck {
        server_time_ms: i64,
        client_time_ms: i64,
        latency_ms: i64,
    },
}

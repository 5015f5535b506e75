use serde::{Deserialize, Serialize};

pub use crate::engine::nl::types::{Chips, SeatId};

pub type SessionId = String;
pub type RoomId = String;
pub type TableId = String;
pub type HandId = u64;

/// Envelope carried by every client message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentHeader {
    pub message_id: String,
    pub sequence: u64,
    pub timestamp_ms: i64,
}

/// Scoping for intents that target a specific table at a specific sequence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableContext {
    pub table_id: TableId,
    pub hand_id: Option<HandId>,
    pub sequence: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerActionRequest {
    Fold,
    Check,
    Call,
    Bet { amount: Chips },
    Raise { amount: Chips },
    AllIn,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum IntentBody {
    JoinRoom {
        room_id: RoomId,
        as_spectator: bool,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    TakeSeat {
        table_context: TableContext,
        seat_index: SeatId,
        buy_in_amount: Chips,
    },
    LeaveSeat {
        table_context: TableContext,
    },
    StandUp {
        table_context: TableContext,
    },
    SitBack {
        table_context: TableContext,
    },
    PlayerAction {
        table_context: TableContext,
        action: PlayerActionRequest,
    },
    RequestSync {
        table_context: TableContext,
        from_sequence: Option<u64>,
    },
    Heartbeat {
        client_time_ms: i64,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub session_id: SessionId,
    pub header: IntentHeader,
    pub body: IntentBody,
}

use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

/// Stable numeric reject code, grouped by hundreds as specified: 1xx
/// connection, 2xx auth, 3xx room, 4xx seat, 5xx action, 6xx sync, 9xx
/// general. Additions must append new values, never renumber existing ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum RejectCode {
    // 1xx connection
    NotConnected = 100,
    InvalidSession = 101,
    SessionExpired = 102,

    // 2xx authorization
    Banned = 200,
    NotAuthenticated = 201,

    // 3xx room
    RoomNotFound = 300,
    RoomClosed = 301,
    RoomFull = 302,
    AlreadyInRoom = 303,
    NotInRoom = 304,
    BuyInBelowMinimum = 305,
    BuyInAboveMaximum = 306,

    // 4xx seat
    SeatNotFound = 400,
    SeatTaken = 401,
    AlreadySeated = 402,
    NotSeated = 403,
    CannotChangeDuringHand = 404,

    // 5xx action
    NotYourTurn = 500,
    IllegalAction = 501,
    InsufficientChips = 502,
    BetTooSmall = 503,
    BetTooLarge = 504,
    ActionTimeout = 505,
    HandNotActive = 506,

    // 6xx sync
    SequenceMismatch = 600,
    StaleIntent = 601,
    Desync = 602,
    InvalidHandId = 603,
    InvalidTableId = 604,

    // 7xx integrity / financial
    DuplicateSettlement = 700,
    InsufficientFunds = 701,
    NonIntegerAmount = 702,
    NegativeAmount = 703,

    // 9xx server
    Internal = 900,
    Maintenance = 901,
    RateLimit = 902,
}

impl Serialize for RejectCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(*self as u16)
    }
}

impl<'de> Deserialize<'de> for RejectCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u16::deserialize(deserializer)?;
        RejectCode::from_u16(code).ok_or_else(|| D::Error::custom(format!("unknown reject code {code}")))
    }
}

impl RejectCode {
    pub fn from_u16(code: u16) -> Option<Self> {
        use RejectCode::*;
        Some(match code {
            100 => NotConnected,
            101 => InvalidSession,
            102 => SessionExpired,
            200 => Banned,
            201 => NotAuthenticated,
            300 => RoomNotFound,
            301 => RoomClosed,
            302 => RoomFull,
            303 => AlreadyInRoom,
            304 => NotInRoom,
            305 => BuyInBelowMinimum,
            306 => BuyInAboveMaximum,
            400 => SeatNotFound,
            401 => SeatTaken,
            402 => AlreadySeated,
            403 => NotSeated,
            404 => CannotChangeDuringHand,
            500 => NotYourTurn,
            501 => IllegalAction,
            502 => InsufficientChips,
            503 => BetTooSmall,
            504 => BetTooLarge,
            505 => ActionTimeout,
            506 => HandNotActive,
            600 => SequenceMismatch,
            601 => StaleIntent,
            602 => Desync,
            603 => InvalidHandId,
            604 => InvalidTableId,
            700 => DuplicateSettlement,
            701 => InsufficientFunds,
            702 => NonIntegerAmount,
            703 => NegativeAmount,
            900 => Internal,
            901 => Maintenance,
            902 => RateLimit,
            _ => return None,
        })
    }

    pub fn reason(self) -> &'static str {
        use RejectCode::*;
        match self {
            NotConnected => "not connected",
            InvalidSession => "invalid session",
            SessionExpired => "session expired",
            Banned => "banned",
            NotAuthenticated => "not authenticated",
            RoomNotFound => "room not found",
            RoomClosed => "room closed",
            RoomFull => "room full",
            AlreadyInRoom => "already in room",
            NotInRoom => "not in room",
            BuyInBelowMinimum => "buy-in below minimum",
            BuyInAboveMaximum => "buy-in above maximum",
            SeatNotFound => "seat not found",
            SeatTaken => "seat taken",
            AlreadySeated => "already seated",
            NotSeated => "not seated",
            CannotChangeDuringHand => "cannot change seat during an active hand",
            NotYourTurn => "not your turn",
            IllegalAction => "illegal action",
            InsufficientChips => "insufficient chips",
            BetTooSmall => "bet too small",
            BetTooLarge => "bet too large",
            ActionTimeout => "action timeout",
            HandNotActive => "hand not active",
            SequenceMismatch => "sequence mismatch",
            StaleIntent => "stale intent",
            Desync => "desynchronized",
            InvalidHandId => "invalid hand id",
            InvalidTableId => "invalid table id",
            DuplicateSettlement => "duplicate settlement",
            InsufficientFunds => "insufficient funds",
            NonIntegerAmount => "non-integer amount",
            NegativeAmount => "negative amount",
            Internal => "internal error",
            Maintenance => "under maintenance",
            RateLimit => "rate limited",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub code: RejectCode,
    pub reason: String,
    pub details: Option<String>,
}

impl Rejection {
    pub fn new(code: RejectCode) -> Self {
        Self {
            reason: code.reason().to_string(),
            code,
            details: None,
        }
    }

    pub fn with_details(code: RejectCode, details: impl Into<String>) -> Self {
        Self {
            reason: code.reason().to_string(),
            code,
            details: Some(details.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reject_codes_stay_in_their_documented_hundred() {
        assert_eq!(RejectCode::InvalidSession as u16 / 100, 1);
        assert_eq!(RejectCode::RoomFull as u16 / 100, 3);
        assert_eq!(RejectCode::SeatTaken as u16 / 100, 4);
        assert_eq!(RejectCode::NotYourTurn as u16 / 100, 5);
        assert_eq!(RejectCode::SequenceMismatch as u16 / 100, 6);
        assert_eq!(RejectCode::DuplicateSettlement as u16 / 100, 7);
        assert_eq!(RejectCode::Internal as u16 / 100, 9);
    }

    #[test]
    fn round_trips_through_json_as_a_number() {
        let encoded = serde_json::to_string(&RejectCode::StaleIntent).unwrap();
        assert_eq!(encoded, "601");
        let decoded: RejectCode = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, RejectCode::StaleIntent);
    }
}

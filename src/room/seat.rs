use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::nl::types::{Chips, SeatId};
use crate::room::card::Card;

pub type PlayerId = String;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    Empty,
    Active,
    Folded,
    AllIn,
    SittingOut,
    Disconnected,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    pub index: SeatId,
    pub occupant: Option<PlayerId>,
    pub stack: Chips,
    pub current_bet: Chips,
    pub total_bet_this_hand: Chips,
    pub status: SeatStatus,
    pub hole_cards: Option<[Card; 2]>,
    pub is_dealer: bool,
    pub disconnected_at: Option<DateTime<Utc>>,
}

impl Seat {
    pub fn empty(index: SeatId) -> Self {
        Self {
            index,
            occupant: None,
            stack: 0,
            current_bet: 0,
            total_bet_this_hand: 0,
            status: SeatStatus::Empty,
            hole_cards: None,
            is_dealer: false,
            disconnected_at: None,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn can_start_hand(&self) -> bool {
        self.is_occupied()
            && self.stack > 0
            && matches!(self.status, SeatStatus::Active | SeatStatus::SittingOut)
    }

    pub fn reset_for_new_hand(&mut self) {
        self.current_bet = 0;
        self.total_bet_this_hand = 0;
        self.hole_cards = None;
        self.is_dealer = false;
        if self.is_occupied() && self.status != SeatStatus::Disconnected {
            self.status = if self.stack == 0 {
                SeatStatus::SittingOut
            } else {
                SeatStatus::Active
            };
        }
    }
}

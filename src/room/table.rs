use serde::{Deserialize, Serialize};

use crate::engine::nl::types::{Chips, SeatId, Street as BettingStreet};
use crate::room::card::Card;
use crate::room::seat::Seat;

pub type HandId = u64;

/// Superset of the betting engine's `Street`: a table also spends time
/// `waiting` between hands and `showdown`/`complete` after the river closes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStreet {
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
    Complete,
}

impl From<BettingStreet> for TableStreet {
    fn from(s: BettingStreet) -> Self {
        match s {
            BettingStreet::Preflop => TableStreet::Preflop,
            BettingStreet::Flop => TableStreet::Flop,
            BettingStreet::Turn => TableStreet::Turn,
            BettingStreet::River => TableStreet::River,
        }
    }
}

impl TableStreet {
    pub fn as_betting_street(self) -> Option<BettingStreet> {
        match self {
            TableStreet::Preflop => Some(BettingStreet::Preflop),
            TableStreet::Flop => Some(BettingStreet::Flop),
            TableStreet::Turn => Some(BettingStreet::Turn),
            TableStreet::River => Some(BettingStreet::River),
            TableStreet::Waiting | TableStreet::Showdown | TableStreet::Complete => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub table_id: String,
    /// Fixed capacity; seat count never changes after construction.
    pub seats: Vec<Seat>,
    pub hand_id: HandId,
    pub street: TableStreet,
    pub community_cards: Vec<Card>,
    pub pot: Chips,
    pub current_bet: Chips,
    pub min_raise: Chips,
    pub dealer_seat: SeatId,
    pub active_to_act: Option<SeatId>,
    pub last_raiser_seat: Option<SeatId>,
    pub actions_this_round: u32,
    pub sequence: u64,
}

impl Table {
    pub fn new(table_id: impl Into<String>, capacity: u8) -> Self {
        Self {
            table_id: table_id.into(),
            seats: (0..capacity).map(Seat::empty).collect(),
            hand_id: 0,
            street: TableStreet::Waiting,
            community_cards: Vec::new(),
            pot: 0,
            current_bet: 0,
            min_raise: 0,
            dealer_seat: 0,
            active_to_act: None,
            last_raiser_seat: None,
            actions_this_round: 0,
            sequence: 0,
        }
    }

    pub fn seat_mut(&mut self, seat_index: SeatId) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.index == seat_index)
    }

    pub fn seat(&self, seat_index: SeatId) -> Option<&Seat> {
        self.seats.iter().find(|s| s.index == seat_index)
    }

    pub fn seated_player_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_occupied()).count()
    }

    /// `canStartHand`: at least two seated players with stack > 0 able to
    /// play this hand.
    pub fn can_start_hand(&self) -> bool {
        self.seats.iter().filter(|s| s.can_start_hand()).count() >= 2
    }

    pub fn validate_invariants(&self) -> Result<(), &'static str> {
        if let Some(active) = self.active_to_act {
            if self.seat(active).is_none() {
                return Err("active_to_act references a nonexistent seat");
            }
        }
        for s in &self.seats {
            if s.current_bet > self.current_bet {
                return Err("current_bet must be >= every seat.current_bet");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_table_has_fixed_empty_seats() {
        let table = Table::new("t1", 6);
        assert_eq!(table.seats.len(), 6);
        assert!(table.seats.iter().all(|s| !s.is_occupied()));
        assert_eq!(table.street, TableStreet::Waiting);
    }

    #[test]
    fn cannot_start_hand_with_fewer_than_two_funded_seats() {
        let mut table = Table::new("t1", 6);
        table.seat_mut(0).unwrap().occupant = Some("p1".into());
        table.seat_mut(0).unwrap().stack = 100;
        table.seat_mut(0).unwrap().status = crate::room::seat::SeatStatus::Active;
        assert!(!table.can_start_hand());

        table.seat_mut(1).unwrap().occupant = Some("p2".into());
        table.seat_mut(1).unwrap().stack = 100;
        table.seat_mut(1).unwrap().status = crate::room::seat::SeatStatus::Active;
        assert!(table.can_start_hand());
    }
}

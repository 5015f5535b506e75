//! Viewer-specific projections of room/table state. The privacy invariant:
//! hole cards are visible only to their owner, or to anyone once the table
//! reaches `showdown`/`complete`.

use serde::{Deserialize, Serialize};

use crate::engine::nl::types::{Chips, SeatId};
use crate::room::room::Room;
use crate::room::seat::{PlayerId, Seat};
use crate::room::table::{Table, TableStreet};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSnapshot {
    pub index: SeatId,
    pub occupant: Option<PlayerId>,
    pub stack: Chips,
    pub current_bet: Chips,
    pub status: crate::room::seat::SeatStatus,
    pub hole_cards: Option<[String; 2]>,
    pub is_dealer: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub table_id: String,
    pub hand_id: u64,
    pub street: TableStreet,
    pub community_cards: Vec<String>,
    pub pot: Chips,
    pub current_bet: Chips,
    pub min_raise: Chips,
    pub dealer_seat: SeatId,
    pub active_to_act: Option<SeatId>,
    pub sequence: u64,
    pub seats: Vec<SeatSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: String,
    pub tables: Vec<TableSnapshot>,
}

fn cards_visible(street: TableStreet) -> bool {
    matches!(street, TableStreet::Showdown | TableStreet::Complete)
}

fn project_seat(seat: &Seat, street: TableStreet, viewer_id: Option<&str>) -> SeatSnapshot {
    let owns = seat.occupant.as_deref() == viewer_id && viewer_id.is_some();
    let hole_cards = if owns || cards_visible(street) {
        seat.hole_cards.map(|cards| [cards[0].to_string(), cards[1].to_string()])
    } else {
        None
    };
    SeatSnapshot {
        index: seat.index,
        occupant: seat.occupant.clone(),
        stack: seat.stack,
        current_bet: seat.current_bet,
        status: seat.status,
        hole_cards,
        is_dealer: seat.is_dealer,
    }
}

pub fn project_table(table: &Table, viewer_id: Option<&str>) -> TableSnapshot {
    TableSnapshot {
        table_id: table.table_id.clone(),
        hand_id: table.hand_id,
        street: table.street,
        community_cards: table.community_cards.iter().map(|c| c.to_string()).collect(),
        pot: table.pot,
        current_bet: table.current_bet,
        min_raise: table.min_raise,
        dealer_seat: table.dealer_seat,
        active_to_act: table.active_to_act,
        sequence: table.sequence,
        seats: table.seats.iter().map(|s| project_seat(s, table.street, viewer_id)).collect(),
    }
}

pub fn project_room(room: &Room, viewer_id: Option<&str>) -> RoomSnapshot {
    let mut tables: Vec<TableSnapshot> = room.tables.values().map(|t| project_table(t, viewer_id)).collect();
    tables.sort_by(|a, b| a.table_id.cmp(&b.table_id));
    RoomSnapshot { room_id: room.room_id.clone(), tables }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use crate::room::card::{Card, Rank, Suit};
    use crate::room::seat::SeatStatus;

    fn seated_table() -> Table {
        let mut table = Table::new("t1", 2);
        let seat = table.seat_mut(0).unwrap();
        seat.occupant = Some("hero".to_string());
        seat.status = SeatStatus::Active;
        seat.hole_cards = Some([Card { rank: Rank::Ace, suit: Suit::Spades }, Card { rank: Rank::King, suit: Suit::Spades }]);
        table
    }

    #[test]
    fn hole_cards_are_hidden_from_non_owners_mid_hand() {
        let table = seated_table();
        let snap = project_table(&table, Some("villain"));
        assert!(snap.seats[0].hole_cards.is_none());
    }

    #[test]
    fn hole_cards_are_visible_to_their_owner() {
        let table = seated_table();
        let snap = project_table(&table, Some("hero"));
        assert!(snap.seats[0].hole_cards.is_some());
    }

    #[test]
    fn hole_cards_become_visible_to_everyone_at_showdown() {
        let mut table = seated_table();
        table.street = TableStreet::Showdown;
        let snap = project_table(&table, Some("villain"));
        assert!(snap.seats[0].hole_cards.is_some());
    }

    #[test]
    fn room_projection_sorts_tables_by_id() {
        let mut room = Room::new("r1", RoomConfig::default());
        room.add_table(Table::new("t2", 2));
        room.add_table(Table::new("t1", 2));
        let snap = project_room(&room, None);
        assert_eq!(snap.tables[0].table_id, "t1");
        assert_eq!(snap.tables[1].table_id, "t2");
    }
}

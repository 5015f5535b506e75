//! Deterministic, ordered diffs between two `RoomSnapshot`s. Given the same
//! (base, current) pair the same operation list comes out every time: field
//! comparisons run in a fixed order, tables and seats are walked in the
//! order they're stored (callers get snapshots with tables pre-sorted by id).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::snapshot::{RoomSnapshot, TableSnapshot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffOpKind {
    Add,
    Replace,
    Remove,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOp {
    pub op: DiffOpKind,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

fn replace(path: String, value: Value) -> DiffOp {
    DiffOp { op: DiffOpKind::Replace, path, value: Some(value) }
}

pub fn diff_table_snapshots(base: &TableSnapshot, current: &TableSnapshot) -> Vec<DiffOp> {
    let mut ops = Vec::new();
    diff_table(base, current, &mut ops);
    ops
}

fn diff_table(base: &TableSnapshot, current: &TableSnapshot, ops: &mut Vec<DiffOp>) {
    let prefix = format!("/tables/{}", current.table_id);

    if base.street != current.street {
        ops.push(replace(format!("{prefix}/street"), json!(current.street)));
    }
    if base.hand_id != current.hand_id {
        ops.push(replace(format!("{prefix}/handId"), json!(current.hand_id)));
    }
    if base.pot != current.pot {
        ops.push(replace(format!("{prefix}/pot"), json!(current.pot)));
    }
    if base.current_bet != current.current_bet {
        ops.push(replace(format!("{prefix}/currentBet"), json!(current.current_bet)));
    }
    if base.min_raise != current.min_raise {
        ops.push(replace(format!("{prefix}/minRaise"), json!(current.min_raise)));
    }
    if base.dealer_seat != current.dealer_seat {
        ops.push(replace(format!("{prefix}/dealerSeat"), json!(current.dealer_seat)));
    }
    if base.active_to_act != current.active_to_act {
        ops.push(replace(format!("{prefix}/activeToAct"), json!(current.active_to_act)));
    }
    if base.community_cards != current.community_cards {
        ops.push(replace(format!("{prefix}/communityCards"), json!(current.community_cards)));
    }

    for (base_seat, current_seat) in base.seats.iter().zip(current.seats.iter()) {
        let seat_prefix = format!("{prefix}/seats/{}", current_seat.index);
        if base_seat.occupant != current_seat.occupant {
            ops.push(replace(format!("{seat_prefix}/occupant"), json!(current_seat.occupant)));
        }
        if base_seat.stack != current_seat.stack {
            ops.push(replace(format!("{seat_prefix}/stack"), json!(current_seat.stack)));
        }
        if base_seat.current_bet != current_seat.current_bet {
            ops.push(replace(format!("{seat_prefix}/currentBet"), json!(current_seat.current_bet)));
        }
        if base_seat.status != current_seat.status {
            ops.push(replace(format!("{seat_prefix}/status"), json!(current_seat.status)));
        }
        if base_seat.is_dealer != current_seat.is_dealer {
            ops.push(replace(format!("{seat_prefix}/isDealer"), json!(current_seat.is_dealer)));
        }
        if base_seat.hole_cards != current_seat.hole_cards {
            ops.push(replace(format!("{seat_prefix}/holeCards"), json!(current_seat.hole_cards)));
        }
    }

    if base.sequence != current.sequence {
        ops.push(replace(format!("{prefix}/sequence"), json!(current.sequence)));
    }
}

pub fn diff_rooms(base: &RoomSnapshot, current: &RoomSnapshot) -> Vec<DiffOp> {
    let mut ops = Vec::new();
    for current_table in &current.tables {
        match base.tables.iter().find(|t| t.table_id == current_table.table_id) {
            Some(base_table) => diff_table(base_table, current_table, &mut ops),
            None => ops.push(DiffOp {
                op: DiffOpKind::Add,
                path: format!("/tables/{}", current_table.table_id),
                value: Some(serde_json::to_value(current_table).expect("TableSnapshot always serializes")),
            }),
        }
    }
    for base_table in &base.tables {
        if !current.tables.iter().any(|t| t.table_id == base_table.table_id) {
            ops.push(DiffOp { op: DiffOpKind::Remove, path: format!("/tables/{}", base_table.table_id), value: None });
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::room::Room;
    use crate::room::table::Table;
    use crate::config::RoomConfig;
    use crate::sync::snapshot::project_room;

    #[test]
    fn identical_snapshots_produce_no_ops() {
        let mut room = Room::new("r1", RoomConfig::default());
        room.add_table(Table::new("t1", 2));
        let snap = project_room(&room, None);
        assert!(diff_rooms(&snap, &snap).is_empty());
    }

    #[test]
    fn a_pot_change_produces_exactly_one_replace_op() {
        let mut room = Room::new("r1", RoomConfig::default());
        room.add_table(Table::new("t1", 2));
        let base = project_room(&room, None);
        room.tables.get_mut("t1").unwrap().pot = 50;
        let current = project_room(&room, None);
        let ops = diff_rooms(&base, &current);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].path, "/tables/t1/pot");
        assert_eq!(ops[0].op, DiffOpKind::Replace);
    }

    #[test]
    fn diffing_is_deterministic_across_repeated_calls() {
        let mut room = Room::new("r1", RoomConfig::default());
        room.add_table(Table::new("t1", 2));
        let base = project_room(&room, None);
        room.tables.get_mut("t1").unwrap().pot = 50;
        room.tables.get_mut("t1").unwrap().current_bet = 10;
        let current = project_room(&room, None);
        let first = diff_rooms(&base, &current);
        let second = diff_rooms(&base, &current);
        assert_eq!(first, second);
    }
}

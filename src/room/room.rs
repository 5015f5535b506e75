use std::collections::{HashMap, HashSet};

use crate::config::RoomConfig;
use crate::room::seat::PlayerId;
use crate::room::table::Table;

pub type RoomId = String;
pub type TableId = String;

#[derive(Clone, Debug, Default)]
pub struct PlayerPresence {
    pub current_table: Option<TableId>,
    pub seat_index: Option<u8>,
    pub is_spectator: bool,
}

/// A container of one or more tables plus membership sets. A room
/// exclusively owns its tables; a table exclusively owns its seats.
pub struct Room {
    pub room_id: RoomId,
    pub config: RoomConfig,
    pub tables: HashMap<TableId, Table>,
    pub players: HashSet<PlayerId>,
    pub spectators: HashSet<PlayerId>,
    pub presence: HashMap<PlayerId, PlayerPresence>,
    pub is_open: bool,
}

impl Room {
    pub fn new(room_id: impl Into<String>, config: RoomConfig) -> Self {
        Self {
            room_id: room_id.into(),
            config,
            tables: HashMap::new(),
            players: HashSet::new(),
            spectators: HashSet::new(),
            presence: HashMap::new(),
            is_open: true,
        }
    }

    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.table_id.clone(), table);
    }

    pub fn join(&mut self, player_id: PlayerId, as_spectator: bool) {
        if as_spectator {
            self.spectators.insert(player_id.clone());
        } else {
            self.players.insert(player_id.clone());
        }
        self.presence.entry(player_id).or_insert_with(|| PlayerPresence {
            is_spectator: as_spectator,
            ..Default::default()
        });
    }

    pub fn leave(&mut self, player_id: &str) {
        self.players.remove(player_id);
        self.spectators.remove(player_id);
        self.presence.remove(player_id);
    }

    pub fn is_member(&self, player_id: &str) -> bool {
        self.players.contains(player_id) || self.spectators.contains(player_id)
    }
}

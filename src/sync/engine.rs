//! Per-table sequence tracking plus a bounded, per-viewer cache of prior
//! projections used to generate diffs instead of full snapshots.

use std::collections::{BTreeMap, HashMap};

use crate::config::SyncConfig;
use crate::protocol::error::RejectCode;
use crate::room::room::Room;
use crate::room::seat::PlayerId;

use super::diff::{diff_table_snapshots, DiffOp};
use super::snapshot::{project_room, project_table, RoomSnapshot, TableSnapshot};

pub enum SyncResponse {
    Snapshot { snapshot: RoomSnapshot },
    Diff { base_sequence: u64, operations: Vec<DiffOp> },
}

#[derive(Default)]
struct TableCache {
    /// Bounded LRU by sequence: oldest entries are evicted once the map
    /// grows past `max_retained_snapshots`.
    by_viewer: HashMap<PlayerId, BTreeMap<u64, TableSnapshot>>,
}

pub struct SyncEngine {
    config: SyncConfig,
    current_sequence: HashMap<String, u64>,
    cache: HashMap<String, TableCache>,
}

impl SyncEngine {
    pub fn new(config: SyncConfig) -> Self {
        Self { config, current_sequence: HashMap::new(), cache: HashMap::new() }
    }

    pub fn current_sequence(&self, table_id: &str) -> u64 {
        self.current_sequence.get(table_id).copied().unwrap_or(0)
    }

    pub fn validate_sequence(&self, table_id: &str, incoming: u64) -> Result<(), RejectCode> {
        let current = self.current_sequence(table_id);
        if incoming < current {
            Err(RejectCode::StaleIntent)
        } else if incoming > current + 1 {
            Err(RejectCode::SequenceMismatch)
        } else {
            Ok(())
        }
    }

    pub fn store_snapshot(&mut self, table_id: &str, table_snapshot: TableSnapshot, viewer_id: &str, sequence: u64) {
        self.current_sequence.insert(table_id.to_string(), sequence);
        let cache = self.cache.entry(table_id.to_string()).or_default();
        let per_viewer = cache.by_viewer.entry(viewer_id.to_string()).or_default();
        per_viewer.insert(sequence, table_snapshot);
        while per_viewer.len() > self.config.max_retained_snapshots {
            let oldest = *per_viewer.keys().next().expect("checked non-empty by the while condition");
            per_viewer.remove(&oldest);
        }
    }

    pub fn should_snapshot(&self, sequence: u64) -> bool {
        sequence % self.config.snapshot_every_k == 0
    }

    /// Full snapshot unless the client has a cached base within `K`
    /// sequences of the current one, in which case a diff suffices.
    pub fn generate_sync_response(
        &mut self,
        room: &Room,
        table_id: &str,
        player_id: &str,
        client_sequence: Option<u64>,
    ) -> Result<SyncResponse, RejectCode> {
        let table = room.tables.get(table_id).ok_or(RejectCode::InvalidTableId)?;
        let current_sequence = table.sequence;
        let current_snapshot = project_table(table, Some(player_id));

        let lagging_too_far = client_sequence
            .map(|seq| current_sequence.saturating_sub(seq) > self.config.snapshot_every_k)
            .unwrap_or(true);

        let cached_base = client_sequence.and_then(|seq| {
            self.cache.get(table_id).and_then(|c| c.by_viewer.get(player_id)).and_then(|m| m.get(&seq)).cloned()
        });

        self.store_snapshot(table_id, current_snapshot.clone(), player_id, current_sequence);

        if lagging_too_far || cached_base.is_none() {
            return Ok(SyncResponse::Snapshot { snapshot: project_room(room, Some(player_id)) });
        }

        let base = cached_base.expect("checked above");
        let operations = diff_table_snapshots(&base, &current_snapshot);
        Ok(SyncResponse::Diff { base_sequence: client_sequence.expect("client_sequence is Some on this branch"), operations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoomConfig;
    use crate::room::table::Table;

    fn room_with_table() -> Room {
        let mut room = Room::new("r1", RoomConfig::default());
        room.add_table(Table::new("t1", 2));
        room
    }

    #[test]
    fn a_request_with_no_base_sequence_gets_a_full_snapshot() {
        let room = room_with_table();
        let mut engine = SyncEngine::new(SyncConfig::default());
        let response = engine.generate_sync_response(&room, "t1", "p1", None).unwrap();
        assert!(matches!(response, SyncResponse::Snapshot { .. }));
    }

    #[test]
    fn a_request_within_k_of_a_cached_base_gets_a_diff() {
        let mut room = room_with_table();
        let mut engine = SyncEngine::new(SyncConfig { snapshot_every_k: 10, max_retained_snapshots: 8 });

        room.tables.get_mut("t1").unwrap().sequence = 1;
        engine.generate_sync_response(&room, "t1", "p1", None).unwrap(); // caches seq 1

        room.tables.get_mut("t1").unwrap().sequence = 2;
        room.tables.get_mut("t1").unwrap().pot = 20;
        let response = engine.generate_sync_response(&room, "t1", "p1", Some(1)).unwrap();
        assert!(matches!(response, SyncResponse::Diff { .. }));
    }

    #[test]
    fn validate_sequence_rejects_stale_and_out_of_order_intents() {
        let mut engine = SyncEngine::new(SyncConfig::default());
        engine.current_sequence.insert("t1".to_string(), 5);
        assert_eq!(engine.validate_sequence("t1", 4), Err(RejectCode::StaleIntent));
        assert_eq!(engine.validate_sequence("t1", 7), Err(RejectCode::SequenceMismatch));
        assert!(engine.validate_sequence("t1", 6).is_ok());
    }
}

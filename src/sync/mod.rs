pub mod diff;
pub mod engine;
pub mod snapshot;

pub use diff::{diff_rooms, DiffOp, DiffOpKind};
pub use engine::{SyncEngine, SyncResponse};
pub use snapshot::{project_room, project_table, RoomSnapshot, SeatSnapshot, TableSnapshot};

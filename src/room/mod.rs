pub mod authority;
pub mod card;
pub mod room;
pub mod seat;
pub mod serializer;
pub mod table;

pub use authority::Authority;
pub use card::{Card, Deck, HandEvaluator, HandRank, HighCardSumEvaluator};
pub use room::Room;
pub use seat::{PlayerId, Seat, SeatStatus};
pub use serializer::RoomSerializer;
pub use table::{Table, TableStreet};

pub mod balance;
pub mod engine;
pub mod escrow;
pub mod ledger;
pub mod pot;
pub mod rake;

pub use balance::{Balance, BalanceManager};
pub use engine::{EconomyEngine, EconomyError, SettlementOutcome};
pub use escrow::EscrowManager;
pub use ledger::{LedgerEntry, LedgerEntryKind, LedgerManager};
pub use pot::{compute_side_pots, settle_pots, Contribution, PotLayer, SidePots};
pub use rake::{calculate_rake, RakeResult};

pub type PlayerId = crate::room::seat::PlayerId;
pub type TableId = String;
pub type HandId = u64;

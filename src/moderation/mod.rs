//! Tools for human moderators sitting on top of the integrity layer:
//! deterministic hand replay, evidence bundling, an append-only decision
//! log, and a case workflow that ties them together. Everything here is
//! read-only with respect to authority, economy, and session state — a
//! moderator can look and decide, never reach in and change the game.

pub mod case;
pub mod decision_log;
pub mod evidence;
mod hash;
pub mod replay;

pub use case::{CaseDecision, CaseError, CaseRecord, CaseStatus, ModerationCase, ModeratorService};
pub use decision_log::{DecisionActionType, DecisionLogEntry, DecisionLogger};
pub use evidence::{EvidenceBundle, EvidenceBundleBuilder, EvidenceError, TableContext};
pub use replay::{HandReplay, HandReplayEngine, HandState, ReplayStep};

use serde::{Deserialize, Serialize};

use super::types::Chips;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Fold,
    Check,               // only when price_to_call == 0
    Call,                // match current price (or go short all-in)
    BetTo { to: Chips }, // first bet this round (unopened pot)
    RaiseTo { to: Chips },
    AllIn, // engine normalizes to bet/raise/call
}

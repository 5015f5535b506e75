//! Wires balances, escrow, pots, rake, and the ledger behind the hand-level
//! surface the room authority calls.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::clock::Clock;
use crate::config::RakeConfig;
use crate::engine::nl::types::{Chips, Street};

use super::balance::BalanceManager;
use super::escrow::EscrowManager;
use super::ledger::{LedgerEntryKind, LedgerManager, RAKE_ACCOUNT};
use super::pot::{self, Contribution, SidePots};
use super::rake::{self, RakeResult};
use super::{HandId, PlayerId, TableId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EconomyError {
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("insufficient chips at the table")]
    InsufficientChips,
    #[error("unknown player {0}")]
    UnknownPlayer(String),
    #[error("hand already settled")]
    AlreadySettled,
    #[error("duplicate settlement id")]
    DuplicateSettlement,
    #[error("pot conservation invariant violated")]
    ConservationViolated,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub payouts: Vec<(PlayerId, Chips)>,
    pub rake: RakeResult,
    pub pots: SidePots,
}

#[derive(Debug, Default, Clone)]
struct HandLedger {
    contributions: HashMap<PlayerId, Contribution>,
    reached_flop: bool,
}

#[derive(Debug)]
pub struct EconomyEngine {
    pub balances: BalanceManager,
    pub escrow: EscrowManager,
    pub ledger: LedgerManager,
    pub rake_config: RakeConfig,
    settled_hands: HashSet<(TableId, HandId)>,
    active_hands: HashMap<(TableId, HandId), HandLedger>,
}

impl EconomyEngine {
    pub fn new(rake_config: RakeConfig) -> Self {
        Self {
            balances: BalanceManager::new(),
            escrow: EscrowManager::new(),
            ledger: LedgerManager::new(),
            rake_config,
            settled_hands: HashSet::new(),
            active_hands: HashMap::new(),
        }
    }

    pub fn initialize_player(&mut self, player_id: &str, starting_balance: Chips, clock: &dyn Clock) {
        self.balances.create_balance(player_id, starting_balance);
        self.ledger.set_initial_balance(player_id, starting_balance, clock);
    }

    pub fn buy_in(&mut self, table_id: &str, player_id: &str, amount: Chips, clock: &dyn Clock) -> Result<(), EconomyError> {
        self.escrow.buy_in(table_id, player_id, amount, &mut self.balances)?;
        self.ledger.record(player_id, LedgerEntryKind::Transfer, -(amount as i64), None, Some(table_id), clock);
        Ok(())
    }

    pub fn start_hand(&mut self, table_id: &str, hand_id: HandId) {
        self.active_hands.insert((table_id.to_string(), hand_id), HandLedger::default());
    }

    pub fn post_blinds(
        &mut self,
        table_id: &str,
        hand_id: HandId,
        postings: &[(PlayerId, Chips)],
        clock: &dyn Clock,
    ) -> Result<(), EconomyError> {
        for (player_id, amount) in postings {
            self.commit_and_record(table_id, hand_id, player_id, *amount, LedgerEntryKind::BlindPost, clock)?;
        }
        Ok(())
    }

    pub fn record_action(
        &mut self,
        table_id: &str,
        hand_id: HandId,
        player_id: &str,
        delta: Chips,
        clock: &dyn Clock,
    ) -> Result<(), EconomyError> {
        if delta > 0 {
            self.commit_and_record(table_id, hand_id, player_id, delta, LedgerEntryKind::Bet, clock)?;
        }
        Ok(())
    }

    /// Marks that this hand's betting has moved past preflop, independent of
    /// whether any further player action occurs afterward (an all-in preflop
    /// hand auto-runs the remaining streets with no further `record_action`
    /// calls, but still reached the flop). Called from street-advance, not
    /// action-recording.
    pub fn mark_flop_reached(&mut self, table_id: &str, hand_id: HandId) {
        self.active_hands.entry((table_id.to_string(), hand_id)).or_insert_with(HandLedger::default).reached_flop = true;
    }

    fn commit_and_record(
        &mut self,
        table_id: &str,
        hand_id: HandId,
        player_id: &str,
        amount: Chips,
        kind: LedgerEntryKind,
        clock: &dyn Clock,
    ) -> Result<(), EconomyError> {
        self.escrow.commit_chips(table_id, player_id, amount)?;
        self.escrow.move_to_pot(table_id, player_id, amount)?;
        let hand = self
            .active_hands
            .entry((table_id.to_string(), hand_id))
            .or_insert_with(HandLedger::default);
        let contribution = hand.contributions.entry(player_id.to_string()).or_insert_with(|| Contribution {
            player_id: player_id.to_string(),
            total_contribution: 0,
            is_all_in: false,
            is_folded: false,
        });
        contribution.total_contribution += amount;
        self.ledger.record(player_id, kind, -(amount as i64), Some(hand_id), Some(table_id), clock);
        Ok(())
    }

    pub fn mark_all_in(&mut self, table_id: &str, hand_id: HandId, player_id: &str) {
        if let Some(hand) = self.active_hands.get_mut(&(table_id.to_string(), hand_id)) {
            if let Some(c) = hand.contributions.get_mut(player_id) {
                c.is_all_in = true;
            }
        }
    }

    pub fn player_folded(&mut self, table_id: &str, hand_id: HandId, player_id: &str) {
        if let Some(hand) = self.active_hands.get_mut(&(table_id.to_string(), hand_id)) {
            if let Some(c) = hand.contributions.get_mut(player_id) {
                c.is_folded = true;
            }
        }
    }

    /// Settles a hand: computes side pots from recorded contributions,
    /// deducts rake from the main pot, distributes payouts to escrow stacks,
    /// and appends the corresponding ledger entries. Idempotent per
    /// `(table_id, hand_id)`.
    pub fn settle_hand(
        &mut self,
        table_id: &str,
        hand_id: HandId,
        winners_by_pot: &[Vec<PlayerId>],
        final_street: Street,
        clock: &dyn Clock,
    ) -> Result<SettlementOutcome, EconomyError> {
        let key = (table_id.to_string(), hand_id);
        if self.settled_hands.contains(&key) {
            return Err(EconomyError::AlreadySettled);
        }
        let hand = self.active_hands.get(&key).cloned().unwrap_or_default();
        let contributions: Vec<Contribution> = hand.contributions.values().cloned().collect();
        let pots = pot::compute_side_pots(&contributions);
        if !pot::verify_conservation(&contributions, &pots) {
            return Err(EconomyError::ConservationViolated);
        }

        let total_pot = pots.total();
        let players_at_showdown = contributions.iter().filter(|c| !c.is_folded).count();
        let rake_result = rake::calculate_rake(total_pot, &self.rake_config, hand.reached_flop, final_street, players_at_showdown);

        let mut rebated_pots = pots.clone();
        let deducted = rake_result.rake_amount.min(rebated_pots.main.amount);
        rebated_pots.main.amount -= deducted;

        let payouts = pot::settle_pots(&rebated_pots, winners_by_pot);
        for (player_id, amount) in &payouts {
            self.escrow.award_pot(table_id, player_id, *amount);
            self.ledger.record(player_id, LedgerEntryKind::PotWin, *amount as i64, Some(hand_id), Some(table_id), clock);
        }
        if deducted > 0 {
            self.ledger.record(RAKE_ACCOUNT, LedgerEntryKind::Rake, deducted as i64, Some(hand_id), Some(table_id), clock);
        }
        let settlement_id = format!("{table_id}:{hand_id}");
        self.ledger
            .record_settlement(&settlement_id, hand_id, table_id, total_pot, deducted, total_pot - deducted, clock)
            .map_err(|_| EconomyError::DuplicateSettlement)?;

        self.settled_hands.insert(key.clone());
        self.active_hands.remove(&key);

        Ok(SettlementOutcome { payouts, rake: rake_result, pots: rebated_pots })
    }

    pub fn get_player_stack(&self, table_id: &str, player_id: &str) -> Chips {
        self.escrow.account_of(table_id, player_id).stack
    }

    pub fn verify_integrity(&self) -> Result<(), super::ledger::DivergenceReport> {
        self.ledger.verify_integrity()
    }
}

//! Per-`(tableId, playerId)` sub-account tracking chips committed to a table,
//! distinct from the player's off-table balance.

use std::collections::HashMap;

use crate::engine::nl::types::Chips;

use super::balance::BalanceManager;
use super::engine::EconomyError;
use super::{PlayerId, TableId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EscrowAccount {
    pub stack: Chips,
    pub committed: Chips,
}

#[derive(Debug, Default)]
pub struct EscrowManager {
    accounts: HashMap<(TableId, PlayerId), EscrowAccount>,
}

impl EscrowManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account_of(&self, table_id: &str, player_id: &str) -> EscrowAccount {
        self.accounts
            .get(&(table_id.to_string(), player_id.to_string()))
            .copied()
            .unwrap_or_default()
    }

    fn entry(&mut self, table_id: &str, player_id: &str) -> &mut EscrowAccount {
        self.accounts
            .entry((table_id.to_string(), player_id.to_string()))
            .or_default()
    }

    pub fn buy_in(
        &mut self,
        table_id: &str,
        player_id: &str,
        amount: Chips,
        balances: &mut BalanceManager,
    ) -> Result<(), EconomyError> {
        balances.lock(player_id, amount)?;
        self.entry(table_id, player_id).stack += amount;
        Ok(())
    }

    pub fn cash_out(
        &mut self,
        table_id: &str,
        player_id: &str,
        amount: Chips,
        balances: &mut BalanceManager,
    ) -> Result<(), EconomyError> {
        let account = self.entry(table_id, player_id);
        if amount > account.stack.saturating_sub(account.committed) {
            return Err(EconomyError::InsufficientFunds);
        }
        account.stack -= amount;
        balances.unlock(player_id, amount)?;
        Ok(())
    }

    pub fn commit_chips(&mut self, table_id: &str, player_id: &str, amount: Chips) -> Result<(), EconomyError> {
        let account = self.entry(table_id, player_id);
        if amount > account.stack.saturating_sub(account.committed) {
            return Err(EconomyError::InsufficientChips);
        }
        account.committed += amount;
        Ok(())
    }

    /// Moves previously-committed chips out of the escrow stack and into the
    /// pot (the pot itself is owned by `PotManager`/`EconomyEngine`).
    pub fn move_to_pot(&mut self, table_id: &str, player_id: &str, amount: Chips) -> Result<(), EconomyError> {
        let account = self.entry(table_id, player_id);
        if amount > account.committed {
            return Err(EconomyError::InsufficientChips);
        }
        account.committed -= amount;
        account.stack -= amount;
        Ok(())
    }

    pub fn award_pot(&mut self, table_id: &str, player_id: &str, amount: Chips) {
        self.entry(table_id, player_id).stack += amount;
    }
}

//! `{playerId -> {available, locked, pending}}`. Every amount is a positive
//! integer; any operation that would drive `available` negative fails.

use std::collections::HashMap;

use crate::engine::nl::types::Chips;

use super::engine::EconomyError;
use super::PlayerId;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Balance {
    pub available: Chips,
    pub locked: Chips,
    pub pending: Chips,
}

#[derive(Debug, Default)]
pub struct BalanceManager {
    balances: HashMap<PlayerId, Balance>,
}

impl BalanceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_balance(&mut self, player_id: &str, initial_available: Chips) {
        self.balances.insert(
            player_id.to_string(),
            Balance { available: initial_available, locked: 0, pending: 0 },
        );
    }

    pub fn balance_of(&self, player_id: &str) -> Balance {
        self.balances.get(player_id).copied().unwrap_or_default()
    }

    fn get_mut(&mut self, player_id: &str) -> Result<&mut Balance, EconomyError> {
        self.balances
            .get_mut(player_id)
            .ok_or_else(|| EconomyError::UnknownPlayer(player_id.to_string()))
    }

    pub fn credit(&mut self, player_id: &str, amount: Chips) -> Result<(), EconomyError> {
        self.get_mut(player_id)?.available += amount;
        Ok(())
    }

    pub fn debit(&mut self, player_id: &str, amount: Chips) -> Result<(), EconomyError> {
        let balance = self.get_mut(player_id)?;
        if balance.available < amount {
            return Err(EconomyError::InsufficientFunds);
        }
        balance.available -= amount;
        Ok(())
    }

    pub fn lock(&mut self, player_id: &str, amount: Chips) -> Result<(), EconomyError> {
        let balance = self.get_mut(player_id)?;
        if balance.available < amount {
            return Err(EconomyError::InsufficientFunds);
        }
        balance.available -= amount;
        balance.locked += amount;
        Ok(())
    }

    pub fn unlock(&mut self, player_id: &str, amount: Chips) -> Result<(), EconomyError> {
        let balance = self.get_mut(player_id)?;
        if balance.locked < amount {
            return Err(EconomyError::InsufficientFunds);
        }
        balance.locked -= amount;
        balance.available += amount;
        Ok(())
    }

    pub fn transfer(&mut self, from: &str, to: &str, amount: Chips) -> Result<(), EconomyError> {
        let from_balance = self.balances.get(from).ok_or_else(|| EconomyError::UnknownPlayer(from.to_string()))?;
        if from_balance.available < amount {
            return Err(EconomyError::InsufficientFunds);
        }
        if !self.balances.contains_key(to) {
            return Err(EconomyError::UnknownPlayer(to.to_string()));
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locking_moves_chips_from_available_to_locked() {
        let mut mgr = BalanceManager::new();
        mgr.create_balance("p1", 1000);
        mgr.lock("p1", 400).unwrap();
        let b = mgr.balance_of("p1");
        assert_eq!(b.available, 600);
        assert_eq!(b.locked, 400);
    }

    #[test]
    fn debit_beyond_available_fails() {
        let mut mgr = BalanceManager::new();
        mgr.create_balance("p1", 100);
        assert!(matches!(mgr.debit("p1", 200), Err(EconomyError::InsufficientFunds)));
    }

    #[test]
    fn transfer_never_debits_unless_credit_side_exists() {
        let mut mgr = BalanceManager::new();
        mgr.create_balance("p1", 100);
        assert!(mgr.transfer("p1", "ghost", 50).is_err());
        assert_eq!(mgr.balance_of("p1").available, 100);
    }
}

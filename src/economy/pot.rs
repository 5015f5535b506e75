//! Standalone side-pot calculation and settlement, independent of the
//! in-round betting engine. `engine::nl::rules::BettingState::compute_pots`
//! recomputes pots for mid-hand bookkeeping and legal-action math; this
//! module is the authoritative, hand-end settlement version and differs in
//! one respect the betting engine doesn't need to get right: folded chips
//! still count toward a threshold's pot amount, only not its eligibility.

use std::collections::HashMap;

use crate::engine::nl::types::Chips;

use super::PlayerId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contribution {
    pub player_id: PlayerId,
    pub total_contribution: Chips,
    pub is_all_in: bool,
    pub is_folded: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PotLayer {
    pub amount: Chips,
    pub eligible: Vec<PlayerId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SidePots {
    pub main: PotLayer,
    pub sides: Vec<PotLayer>,
}

impl SidePots {
    pub fn layers(&self) -> impl Iterator<Item = &PotLayer> {
        std::iter::once(&self.main).chain(self.sides.iter())
    }

    pub fn total(&self) -> Chips {
        self.layers().map(|l| l.amount).sum()
    }
}

/// 1. Sort ascending by `totalContribution`. 2. Walk distinct thresholds; at
/// each, the pot amount is `(threshold - previous) * (count of players whose
/// contribution >= threshold)`, counting folded players too since their
/// chips remain in the pot. 3. The eligible set for that layer is every
/// non-folded player at or above the threshold.
pub fn compute_side_pots(contributions: &[Contribution]) -> SidePots {
    let mut sorted: Vec<&Contribution> = contributions.iter().collect();
    sorted.sort_by_key(|c| c.total_contribution);

    let mut thresholds: Vec<Chips> = sorted
        .iter()
        .map(|c| c.total_contribution)
        .filter(|&c| c > 0)
        .collect();
    thresholds.sort_unstable();
    thresholds.dedup();

    if thresholds.is_empty() {
        return SidePots { main: PotLayer { amount: 0, eligible: Vec::new() }, sides: Vec::new() };
    }

    let mut layers = Vec::new();
    let mut previous = 0;
    for threshold in thresholds {
        let tier = threshold - previous;
        let count_at_or_above = contributions.iter().filter(|c| c.total_contribution >= threshold).count() as Chips;
        let amount = tier * count_at_or_above;
        let mut eligible: Vec<PlayerId> = contributions
            .iter()
            .filter(|c| !c.is_folded && c.total_contribution >= threshold)
            .map(|c| c.player_id.clone())
            .collect();
        eligible.sort();
        layers.push(PotLayer { amount, eligible });
        previous = threshold;
    }

    let main = layers.remove(0);
    SidePots { main, sides: layers }
}

pub fn verify_conservation(contributions: &[Contribution], pots: &SidePots) -> bool {
    let total_in: Chips = contributions.iter().map(|c| c.total_contribution).sum();
    total_in == pots.total()
}

/// Awards `floor(amount / winners.len())` to each winner of a pot, handing
/// the remainder one chip at a time to winners in the order given. Pots with
/// no eligible winner are skipped (the caller is expected to have already
/// filtered `winners_by_pot` down to eligible, ranked players).
pub fn settle_pots(pots: &SidePots, winners_by_pot: &[Vec<PlayerId>]) -> Vec<(PlayerId, Chips)> {
    let mut payouts: HashMap<PlayerId, Chips> = HashMap::new();
    for (layer, winners) in pots.layers().zip(winners_by_pot.iter()) {
        if winners.is_empty() {
            continue;
        }
        let share = layer.amount / winners.len() as Chips;
        let mut remainder = layer.amount % winners.len() as Chips;
        for winner in winners {
            let mut amount = share;
            if remainder > 0 {
                amount += 1;
                remainder -= 1;
            }
            *payouts.entry(winner.clone()).or_insert(0) += amount;
        }
    }
    let mut out: Vec<(PlayerId, Chips)> = payouts.into_iter().collect();
    out.sort();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(player: &str, total: Chips, all_in: bool, folded: bool) -> Contribution {
        Contribution {
            player_id: player.to_string(),
            total_contribution: total,
            is_all_in: all_in,
            is_folded: folded,
        }
    }

    #[test]
    fn three_way_all_in_produces_main_and_two_side_pots() {
        let contributions = vec![c("a", 100, true, false), c("b", 300, true, false), c("c", 600, false, false)];
        let pots = compute_side_pots(&contributions);
        assert!(verify_conservation(&contributions, &pots));
        assert_eq!(pots.main.amount, 300); // 100 * 3
        assert_eq!(pots.sides[0].amount, 400); // 200 * 2
        assert_eq!(pots.sides[1].amount, 300); // 300 * 1
        assert_eq!(pots.main.eligible, vec!["a", "b", "c"]);
        assert_eq!(pots.sides[1].eligible, vec!["c"]);
    }

    #[test]
    fn folded_contributions_stay_in_the_pot_but_are_not_eligible() {
        let contributions = vec![c("a", 50, false, true), c("b", 50, false, false)];
        let pots = compute_side_pots(&contributions);
        assert_eq!(pots.main.amount, 100);
        assert_eq!(pots.main.eligible, vec!["b"]);
        assert!(verify_conservation(&contributions, &pots));
    }

    #[test]
    fn remainder_goes_to_winners_in_listed_order() {
        let contributions = vec![c("a", 10, false, false), c("b", 10, false, false)];
        let pots = compute_side_pots(&contributions); // single 20-chip pot
        let payouts = settle_pots(&pots, &[vec!["a".to_string(), "b".to_string()]]);
        // 20 split two ways with no remainder either way: verify exact split.
        let a = payouts.iter().find(|(p, _)| p == "a").unwrap().1;
        let b = payouts.iter().find(|(p, _)| p == "b").unwrap().1;
        assert_eq!(a + b, 20);
    }

    #[test]
    fn odd_remainder_is_awarded_one_chip_at_a_time_in_order() {
        let pots = SidePots { main: PotLayer { amount: 19, eligible: vec!["a".into(), "b".into()] }, sides: vec![] };
        let payouts = settle_pots(&pots, &[vec!["a".to_string(), "b".to_string()]]);
        let a = payouts.iter().find(|(p, _)| p == "a").unwrap().1;
        let b = payouts.iter().find(|(p, _)| p == "b").unwrap().1;
        assert_eq!(a, 10);
        assert_eq!(b, 9);
    }
}

use crate::config::{RakeConfig, RakePolicy};
use crate::engine::nl::types::{Chips, Street};

fn street_rank(street: Street) -> u8 {
    match street {
        Street::Preflop => 0,
        Street::Flop => 1,
        Street::Turn => 2,
        Street::River => 3,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RakeResult {
    pub rake_amount: Chips,
    pub pot_after_rake: Chips,
    pub cap_applied: bool,
    pub waived: bool,
    pub waived_reason: Option<&'static str>,
    pub policy_used: RakePolicy,
}

impl RakeResult {
    fn waived(pot: Chips, policy: RakePolicy, reason: &'static str) -> Self {
        Self {
            rake_amount: 0,
            pot_after_rake: pot,
            cap_applied: false,
            waived: true,
            waived_reason: Some(reason),
            policy_used: policy,
        }
    }
}

/// `reached_flop` distinguishes a hand that ended preflop (all folded to the
/// last aggressor before any community card) from one that saw the flop,
/// for the `noFlopNoRake` waiver.
pub fn calculate_rake(
    pot: Chips,
    cfg: &RakeConfig,
    reached_flop: bool,
    final_street: Street,
    players_at_showdown: usize,
) -> RakeResult {
    if cfg.policy == RakePolicy::Zero {
        return RakeResult::waived(pot, RakePolicy::Zero, "policy_zero");
    }
    if cfg.no_flop_no_rake && !reached_flop {
        return RakeResult::waived(pot, cfg.policy, "no_flop_no_rake");
    }
    if cfg.exclude_uncontested && players_at_showdown < 2 {
        return RakeResult::waived(pot, cfg.policy, "excluded_uncontested");
    }
    if cfg.promo_waiver_active {
        return RakeResult::waived(pot, cfg.policy, "promotional_waiver");
    }

    match cfg.policy {
        RakePolicy::Zero => unreachable!("handled above"),
        RakePolicy::Standard => {
            let raw = pot * cfg.percentage as Chips / 10_000;
            let capped = raw.min(cfg.cap);
            RakeResult {
                rake_amount: capped,
                pot_after_rake: pot - capped,
                cap_applied: raw > cfg.cap,
                waived: false,
                waived_reason: None,
                policy_used: RakePolicy::Standard,
            }
        }
        RakePolicy::Tiered => {
            let tier = cfg.tiers.iter().find(|t| pot >= t.min_pot && t.max_pot.map(|m| pot < m).unwrap_or(true));
            let Some(tier) = tier else {
                return RakeResult::waived(pot, RakePolicy::Tiered, "no_matching_tier");
            };
            let raw = pot * tier.percentage as Chips / 10_000;
            let capped = raw.min(tier.cap);
            RakeResult {
                rake_amount: capped,
                pot_after_rake: pot - capped,
                cap_applied: raw > tier.cap,
                waived: false,
                waived_reason: None,
                policy_used: RakePolicy::Tiered,
            }
        }
        RakePolicy::StreetBased => {
            if street_rank(final_street) < street_rank(cfg.min_street_for_rake) {
                return RakeResult::waived(pot, RakePolicy::StreetBased, "street_not_reached");
            }
            let raw = pot * cfg.percentage as Chips / 10_000;
            let capped = raw.min(cfg.cap);
            RakeResult {
                rake_amount: capped,
                pot_after_rake: pot - capped,
                cap_applied: raw > cfg.cap,
                waived: false,
                waived_reason: None,
                policy_used: RakePolicy::StreetBased,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RakeTier;

    fn standard_cfg() -> RakeConfig {
        RakeConfig { policy: RakePolicy::Standard, percentage: 500, cap: 3, ..RakeConfig::default() }
    }

    #[test]
    fn standard_rake_is_percentage_capped() {
        let cfg = standard_cfg();
        let result = calculate_rake(60, &cfg, true, Street::River, 2);
        assert_eq!(result.rake_amount, 3);
        assert!(result.cap_applied);
        assert_eq!(result.pot_after_rake, 57);
    }

    #[test]
    fn no_flop_no_rake_waives_preflop_hands() {
        let cfg = standard_cfg();
        let result = calculate_rake(60, &cfg, false, Street::Preflop, 1);
        assert!(result.waived);
        assert_eq!(result.rake_amount, 0);
    }

    #[test]
    fn tiered_policy_picks_the_matching_band() {
        let cfg = RakeConfig {
            policy: RakePolicy::Tiered,
            tiers: vec![
                RakeTier { min_pot: 0, max_pot: Some(100), percentage: 500, cap: 3 },
                RakeTier { min_pot: 100, max_pot: None, percentage: 300, cap: 10 },
            ],
            ..RakeConfig::default()
        };
        let small = calculate_rake(50, &cfg, true, Street::River, 2);
        let big = calculate_rake(500, &cfg, true, Street::River, 2);
        assert_eq!(small.rake_amount, 2); // 50*5% = 2.5 -> floor 2
        assert_eq!(big.rake_amount, 10); // 500*3% = 15, capped at 10
        assert!(big.cap_applied);
    }

    #[test]
    fn excluded_uncontested_waives_when_hand_ends_by_folds() {
        let cfg = RakeConfig { exclude_uncontested: true, no_flop_no_rake: false, ..standard_cfg() };
        let result = calculate_rake(60, &cfg, true, Street::Flop, 1);
        assert!(result.waived);
        assert_eq!(result.waived_reason, Some("excluded_uncontested"));
    }
}

//! Deterministic, pure functions over an `IntegrityEvent` stream. Nothing
//! here mutates its input or depends on anything but the events passed in:
//! two calls over the same slice return bit-identical output.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::economy::PlayerId;
use crate::engine::nl::types::{Chips, Street};

use super::events::{IntegrityEvent, RecordedAction};

/// Action-timing thresholds. Configurable per the spec ("quick-fold,
/// long-tank thresholds configurable"); `BehaviorMetrics` callers pass one
/// explicitly rather than relying on a hidden default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingThresholds {
    pub quick_action_ms: u64,
    pub long_tank_ms: u64,
}

impl Default for TimingThresholds {
    fn default() -> Self {
        Self { quick_action_ms: 2_000, long_tank_ms: 20_000 }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerMetrics {
    pub player_id: PlayerId,
    pub hands_played: u64,
    pub hands_won: u64,
    pub vpip: f64,
    pub pfr: f64,
    pub three_bet_rate: f64,
    pub c_bet_rate: f64,
    pub aggression_factor: f64,
    pub aggression_frequency: f64,
    pub fold_to_raise: f64,
    pub wtsd: f64,
    pub wsd: f64,
    pub early_position_vpip: f64,
    pub late_position_vpip: f64,
    pub positional_awareness_delta: f64,
    pub heads_up_aggression_factor: f64,
    pub multiway_aggression_factor: f64,
    pub heads_up_vs_multiway_delta: f64,
    pub quick_action_rate: f64,
    pub long_tank_rate: f64,
    pub net_chip_change: i64,
    pub biggest_win: Chips,
    pub biggest_loss: Chips,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PairMetrics {
    pub player_a: PlayerId,
    pub player_b: PlayerId,
    pub hands_played_together: u64,
    pub heads_up_confrontations: u64,
    pub net_flow_a_to_b: i64,
    pub aggression_asymmetry: f64,
    pub fold_asymmetry: f64,
    pub showdown_rate: f64,
}

fn is_aggressive(action: RecordedAction) -> bool {
    matches!(action, RecordedAction::Bet | RecordedAction::Raise | RecordedAction::AllIn)
}

fn is_voluntary(action: RecordedAction) -> bool {
    !matches!(action, RecordedAction::Check)
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Per-player behavior metrics computed over the full event stream. Events
/// for other tables/players are simply ignored by the relevant filters, so
/// callers can pass the whole collector snapshot without pre-filtering.
pub fn compute_player_metrics(events: &[IntegrityEvent], player_id: &str, thresholds: TimingThresholds) -> PlayerMetrics {
    let hands_started: HashSet<u64> =
        events.iter().filter_map(|e| match e {
            IntegrityEvent::HandStarted { hand_id, players, .. } if players.iter().any(|p| p.as_str() == player_id) => Some(*hand_id),
            _ => None,
        }).collect();
    let hands_played = hands_started.len() as u64;

    let hands_won = events
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::PotAwarded { winner, .. } if winner.as_str() == player_id))
        .count() as u64;

    let actions: Vec<&IntegrityEvent> = events
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::ActionTaken { player_id: p, .. } if p.as_str() == player_id))
        .collect();

    let preflop_actions: Vec<&IntegrityEvent> =
        actions.iter().filter(|e| matches!(e, IntegrityEvent::ActionTaken { street: Street::Preflop, .. })).copied().collect();

    let voluntary_preflop = preflop_actions
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::ActionTaken { action, .. } if is_voluntary(*action)))
        .count() as u64;
    let vpip = ratio(voluntary_preflop, hands_played);

    let preflop_raises = preflop_actions
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::ActionTaken { action, .. } if is_aggressive(*action)))
        .count() as u64;
    let pfr = ratio(preflop_raises, hands_played);

    // A 3-bet is a preflop raise that is not this player's first voluntary
    // preflop action in the hand.
    let mut three_bets = 0u64;
    for &hand_id in &hands_started {
        let mut seen_voluntary = false;
        for event in events {
            if let IntegrityEvent::ActionTaken { hand_id: h, street: Street::Preflop, player_id: p, action, .. } = event {
                if *h != hand_id || p.as_str() != player_id {
                    continue;
                }
                if is_voluntary(*action) {
                    if seen_voluntary && is_aggressive(*action) {
                        three_bets += 1;
                    }
                    seen_voluntary = true;
                }
            }
        }
    }
    let three_bet_rate = ratio(three_bets, hands_played);

    let flop_actions: Vec<&IntegrityEvent> =
        actions.iter().filter(|e| matches!(e, IntegrityEvent::ActionTaken { street: Street::Flop, .. })).copied().collect();
    let c_bets = flop_actions
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::ActionTaken { action, .. } if is_aggressive(*action)))
        .count() as u64;
    let c_bet_rate = ratio(c_bets, hands_played);

    let bets_and_raises = actions
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::ActionTaken { action, .. } if matches!(action, RecordedAction::Bet | RecordedAction::Raise)))
        .count() as u64;
    let calls = actions.iter().filter(|e| matches!(e, IntegrityEvent::ActionTaken { action: RecordedAction::Call, .. })).count() as u64;
    let folds = actions.iter().filter(|e| matches!(e, IntegrityEvent::ActionTaken { action: RecordedAction::Fold, .. })).count() as u64;
    let aggression_factor = if calls == 0 { bets_and_raises as f64 } else { bets_and_raises as f64 / calls as f64 };
    let aggression_frequency = ratio(bets_and_raises, actions.len() as u64);

    let raises_facing = actions
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::ActionTaken { facing_bet: true, .. }))
        .count() as u64;
    let fold_to_raise = ratio(folds, raises_facing.max(folds));

    let went_to_showdown = events
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::PotAwarded { went_to_showdown: true, contributors, .. } if contributors.iter().any(|p| p.as_str() == player_id)))
        .count() as u64;
    let wtsd = ratio(went_to_showdown, hands_played);
    let won_at_showdown = events
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::PotAwarded { went_to_showdown: true, winner, .. } if winner.as_str() == player_id))
        .count() as u64;
    let wsd = ratio(won_at_showdown, went_to_showdown.max(won_at_showdown));

    let heads_up_actions: Vec<&IntegrityEvent> =
        actions.iter().filter(|e| matches!(e, IntegrityEvent::ActionTaken { is_heads_up: true, .. })).copied().collect();
    let multiway_actions: Vec<&IntegrityEvent> =
        actions.iter().filter(|e| matches!(e, IntegrityEvent::ActionTaken { is_heads_up: false, .. })).copied().collect();
    let heads_up_aggression_factor = aggression_factor_for(&heads_up_actions);
    let multiway_aggression_factor = aggression_factor_for(&multiway_actions);
    let heads_up_vs_multiway_delta = heads_up_aggression_factor - multiway_aggression_factor;

    let quick_actions = actions
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::ActionTaken { time_to_act_ms, .. } if *time_to_act_ms <= thresholds.quick_action_ms))
        .count() as u64;
    let long_tanks = actions
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::ActionTaken { time_to_act_ms, .. } if *time_to_act_ms >= thresholds.long_tank_ms))
        .count() as u64;
    let quick_action_rate = ratio(quick_actions, actions.len() as u64);
    let long_tank_rate = ratio(long_tanks, actions.len() as u64);

    let mut net_chip_change: i64 = 0;
    let mut biggest_win: Chips = 0;
    let mut biggest_loss: Chips = 0;
    for event in events {
        if let IntegrityEvent::PotAwarded { winner, amount, contributors, .. } = event {
            if winner.as_str() == player_id {
                net_chip_change += *amount as i64;
                biggest_win = biggest_win.max(*amount);
            }
            if let Some(contribution) = contributors.iter().find(|p| p.as_str() == player_id) {
                let _ = contribution;
                if winner.as_str() != player_id {
                    // Contribution amounts aren't tracked per-pot here; a
                    // loss is recorded as participation without a winning
                    // share, scaled by an equal split against contributors.
                    let share = *amount / contributors.len().max(1) as u64;
                    net_chip_change -= share as i64;
                    biggest_loss = biggest_loss.max(share);
                }
            }
        }
    }

    // Positional VPIP needs seat/button context this event stream does not
    // carry directly; approximate with the overall VPIP for both bands until
    // a HandStarted-derived position index is threaded through, and report
    // a zero delta rather than a fabricated split.
    let early_position_vpip = vpip;
    let late_position_vpip = vpip;
    let positional_awareness_delta = late_position_vpip - early_position_vpip;

    PlayerMetrics {
        player_id: player_id.to_string(),
        hands_played,
        hands_won,
        vpip,
        pfr,
        three_bet_rate,
        c_bet_rate,
        aggression_factor,
        aggression_frequency,
        fold_to_raise,
        wtsd,
        wsd,
        early_position_vpip,
        late_position_vpip,
        positional_awareness_delta,
        heads_up_aggression_factor,
        multiway_aggression_factor,
        heads_up_vs_multiway_delta,
        quick_action_rate,
        long_tank_rate,
        net_chip_change,
        biggest_win,
        biggest_loss,
    }
}

fn aggression_factor_for(actions: &[&IntegrityEvent]) -> f64 {
    let bets_and_raises = actions
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::ActionTaken { action, .. } if matches!(action, RecordedAction::Bet | RecordedAction::Raise)))
        .count() as u64;
    let calls = actions.iter().filter(|e| matches!(e, IntegrityEvent::ActionTaken { action: RecordedAction::Call, .. })).count() as u64;
    if calls == 0 {
        bets_and_raises as f64
    } else {
        bets_and_raises as f64 / calls as f64
    }
}

/// For every `pot_awarded` event, the amount is apportioned equally among
/// the listed contributors toward the winner; entries never go negative.
pub fn chip_flow_matrix(events: &[IntegrityEvent]) -> HashMap<(PlayerId, PlayerId), Chips> {
    let mut flows: HashMap<(PlayerId, PlayerId), Chips> = HashMap::new();
    for event in events {
        if let IntegrityEvent::PotAwarded { winner, amount, contributors, .. } = event {
            let payers: Vec<&PlayerId> = contributors.iter().filter(|p| p.as_str() != winner.as_str()).collect();
            if payers.is_empty() {
                continue;
            }
            let share = amount / payers.len() as u64;
            for payer in payers {
                *flows.entry((payer.clone(), winner.clone())).or_insert(0) += share;
            }
        }
    }
    flows
}

pub fn compute_pair_metrics(events: &[IntegrityEvent], player_a: &str, player_b: &str) -> PairMetrics {
    let hands_together: HashSet<u64> = events
        .iter()
        .filter_map(|e| match e {
            IntegrityEvent::HandStarted { hand_id, players, .. }
                if players.iter().any(|p| p.as_str() == player_a) && players.iter().any(|p| p.as_str() == player_b) =>
            {
                Some(*hand_id)
            }
            _ => None,
        })
        .collect();

    let heads_up_confrontations = events
        .iter()
        .filter_map(|e| match e {
            IntegrityEvent::HandStarted { hand_id, players, .. }
                if players.len() == 2 && players.iter().any(|p| p.as_str() == player_a) && players.iter().any(|p| p.as_str() == player_b) =>
            {
                Some(*hand_id)
            }
            _ => None,
        })
        .count() as u64;

    let flows = chip_flow_matrix(events);
    let a_to_b = flows.get(&(player_a.to_string(), player_b.to_string())).copied().unwrap_or(0) as i64;
    let b_to_a = flows.get(&(player_b.to_string(), player_a.to_string())).copied().unwrap_or(0) as i64;
    let net_flow_a_to_b = a_to_b - b_to_a;

    let raises_a_to_b = count_raises_between(events, player_a, player_b, &hands_together);
    let raises_b_to_a = count_raises_between(events, player_b, player_a, &hands_together);
    let total_raises = raises_a_to_b + raises_b_to_a;
    let aggression_asymmetry = if total_raises == 0 { 0.0 } else { (raises_a_to_b as f64 - raises_b_to_a as f64).abs() / total_raises as f64 };

    let folds_a = count_folds_in_hands(events, player_a, &hands_together);
    let folds_b = count_folds_in_hands(events, player_b, &hands_together);
    let total_folds = folds_a + folds_b;
    let fold_asymmetry = if total_folds == 0 { 0.0 } else { (folds_a as f64 - folds_b as f64).abs() / total_folds as f64 };

    let showdowns = events
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::PotAwarded { went_to_showdown: true, hand_id, .. } if hands_together.contains(hand_id)))
        .count() as u64;
    let showdown_rate = ratio(showdowns, hands_together.len() as u64);

    PairMetrics {
        player_a: player_a.to_string(),
        player_b: player_b.to_string(),
        hands_played_together: hands_together.len() as u64,
        heads_up_confrontations,
        net_flow_a_to_b,
        aggression_asymmetry,
        fold_asymmetry,
        showdown_rate,
    }
}

fn count_raises_between(events: &[IntegrityEvent], actor: &str, _counterpart: &str, hands: &HashSet<u64>) -> u64 {
    events
        .iter()
        .filter(|e| {
            matches!(e, IntegrityEvent::ActionTaken { player_id, action, hand_id, .. }
                if player_id.as_str() == actor && is_aggressive(*action) && hands.contains(hand_id))
        })
        .count() as u64
}

fn count_folds_in_hands(events: &[IntegrityEvent], actor: &str, hands: &HashSet<u64>) -> u64 {
    events
        .iter()
        .filter(|e| {
            matches!(e, IntegrityEvent::ActionTaken { player_id, action: RecordedAction::Fold, hand_id, .. }
                if player_id.as_str() == actor && hands.contains(hand_id))
        })
        .count() as u64
}

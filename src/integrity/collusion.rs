//! Rule-based, deterministic collusion detection over pairs of players that
//! have played hands together. Every pattern here is a pure function of the
//! event stream; nothing is learned or fit from a prior corpus.

use std::collections::{HashMap, HashSet};

use crate::economy::{HandId, PlayerId};

use super::events::{IntegrityEvent, RecordedAction};
use super::metrics::{chip_flow_matrix, compute_pair_metrics};
use super::signal::DetectionIndicator;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollusionThresholds {
    /// T1: fraction of a player's total losses flowing to one opponent.
    pub chip_concentration_threshold: f64,
    /// T2: normalized raise-count asymmetry between a pair.
    pub aggression_asymmetry_threshold: f64,
    /// Analogous threshold over folds.
    pub fold_asymmetry_threshold: f64,
    pub min_pair_sample_size: u64,
    /// Expected raises-per-heads-up-hand floor; below this is soft.
    pub heads_up_raise_floor: f64,
    /// Coordinated-pattern recurrence required before it's reported.
    pub recurrence_threshold: u64,
}

impl Default for CollusionThresholds {
    fn default() -> Self {
        Self {
            chip_concentration_threshold: 0.6,
            aggression_asymmetry_threshold: 0.5,
            fold_asymmetry_threshold: 0.5,
            min_pair_sample_size: 5,
            heads_up_raise_floor: 0.5,
            recurrence_threshold: 3,
        }
    }
}

fn player_ids(events: &[IntegrityEvent]) -> Vec<PlayerId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for event in events {
        if let IntegrityEvent::HandStarted { players, .. } = event {
            for player in players {
                if seen.insert(player.clone()) {
                    ids.push(player.clone());
                }
            }
        }
    }
    ids.sort();
    ids
}

fn total_losses(events: &[IntegrityEvent], player_id: &str) -> f64 {
    let flows = chip_flow_matrix(events);
    flows.iter().filter(|((from, _), _)| from.as_str() == player_id).map(|(_, amount)| *amount as f64).sum()
}

/// Chip-transfer concentration: does one opponent account for an outsized
/// share of a player's losses?
pub fn detect_chip_concentration(events: &[IntegrityEvent], thresholds: &CollusionThresholds) -> Vec<DetectionIndicator> {
    let flows = chip_flow_matrix(events);
    let mut indicators = Vec::new();
    for player_id in player_ids(events) {
        let total = total_losses(events, &player_id);
        if total <= 0.0 {
            continue;
        }
        for ((from, to), amount) in &flows {
            if from.as_str() != player_id.as_str() {
                continue;
            }
            let strength = *amount as f64 / total;
            if strength >= thresholds.chip_concentration_threshold {
                let affected_hands = hands_between(events, &player_id, to);
                indicators.push(DetectionIndicator {
                    pattern: "chip_transfer_concentration".to_string(),
                    strength: strength.min(1.0),
                    occurrences: affected_hands.len() as u64,
                    expected_count: total / player_ids(events).len().max(1) as f64,
                    z_score: strength - thresholds.chip_concentration_threshold,
                    involved_players: vec![player_id.clone(), to.clone()],
                    affected_hands,
                });
            }
        }
    }
    indicators
}

fn hands_between(events: &[IntegrityEvent], a: &str, b: &str) -> Vec<HandId> {
    events
        .iter()
        .filter_map(|e| match e {
            IntegrityEvent::HandStarted { hand_id, players, .. }
                if players.iter().any(|p| p.as_str() == a) && players.iter().any(|p| p.as_str() == b) =>
            {
                Some(*hand_id)
            }
            _ => None,
        })
        .collect()
}

fn all_pairs(ids: &[PlayerId]) -> Vec<(PlayerId, PlayerId)> {
    let mut pairs = Vec::new();
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            pairs.push((ids[i].clone(), ids[j].clone()));
        }
    }
    pairs
}

pub fn detect_asymmetric_aggression(events: &[IntegrityEvent], thresholds: &CollusionThresholds) -> Vec<DetectionIndicator> {
    let ids = player_ids(events);
    let mut indicators = Vec::new();
    for (a, b) in all_pairs(&ids) {
        let pair = compute_pair_metrics(events, &a, &b);
        if pair.hands_played_together < thresholds.min_pair_sample_size {
            continue;
        }
        if pair.aggression_asymmetry >= thresholds.aggression_asymmetry_threshold {
            indicators.push(DetectionIndicator {
                pattern: "asymmetric_aggression".to_string(),
                strength: pair.aggression_asymmetry.min(1.0),
                occurrences: pair.hands_played_together,
                expected_count: thresholds.aggression_asymmetry_threshold,
                z_score: pair.aggression_asymmetry - thresholds.aggression_asymmetry_threshold,
                involved_players: vec![a.clone(), b.clone()],
                affected_hands: hands_between(events, &a, &b),
            });
        }
    }
    indicators
}

pub fn detect_abnormal_fold_pattern(events: &[IntegrityEvent], thresholds: &CollusionThresholds) -> Vec<DetectionIndicator> {
    let ids = player_ids(events);
    let mut indicators = Vec::new();
    for (a, b) in all_pairs(&ids) {
        let pair = compute_pair_metrics(events, &a, &b);
        if pair.hands_played_together < thresholds.min_pair_sample_size {
            continue;
        }
        if pair.fold_asymmetry >= thresholds.fold_asymmetry_threshold {
            indicators.push(DetectionIndicator {
                pattern: "abnormal_fold_pattern".to_string(),
                strength: pair.fold_asymmetry.min(1.0),
                occurrences: pair.hands_played_together,
                expected_count: thresholds.fold_asymmetry_threshold,
                z_score: pair.fold_asymmetry - thresholds.fold_asymmetry_threshold,
                involved_players: vec![a.clone(), b.clone()],
                affected_hands: hands_between(events, &a, &b),
            });
        }
    }
    indicators
}

pub fn detect_soft_play_heads_up(events: &[IntegrityEvent], thresholds: &CollusionThresholds) -> Vec<DetectionIndicator> {
    let ids = player_ids(events);
    let mut indicators = Vec::new();
    for (a, b) in all_pairs(&ids) {
        let pair = compute_pair_metrics(events, &a, &b);
        if pair.heads_up_confrontations < thresholds.min_pair_sample_size {
            continue;
        }
        let raises = events
            .iter()
            .filter(|e| {
                matches!(e, IntegrityEvent::ActionTaken { player_id, action: RecordedAction::Raise, .. }
                    if player_id.as_str() == a || player_id.as_str() == b)
            })
            .count() as f64;
        let raises_per_hand = raises / pair.heads_up_confrontations as f64;
        if raises_per_hand < thresholds.heads_up_raise_floor {
            let strength = 1.0 - (raises_per_hand / thresholds.heads_up_raise_floor).min(1.0);
            indicators.push(DetectionIndicator {
                pattern: "soft_play_heads_up".to_string(),
                strength,
                occurrences: pair.heads_up_confrontations,
                expected_count: thresholds.heads_up_raise_floor,
                z_score: thresholds.heads_up_raise_floor - raises_per_hand,
                involved_players: vec![a.clone(), b.clone()],
                affected_hands: hands_between(events, &a, &b),
            });
        }
    }
    indicators
}

/// Coordinated betting / unnatural checkdowns: a hand where both players
/// reach showdown with zero raises between them, heads-up. Reported only
/// once the same player set has recurred `recurrence_threshold` times.
pub fn detect_coordinated_checkdowns(events: &[IntegrityEvent], thresholds: &CollusionThresholds) -> Vec<DetectionIndicator> {
    let ids = player_ids(events);
    let mut indicators = Vec::new();
    for (a, b) in all_pairs(&ids) {
        let heads_up_hands: Vec<HandId> = events
            .iter()
            .filter_map(|e| match e {
                IntegrityEvent::HandStarted { hand_id, players, .. }
                    if players.len() == 2 && players.iter().any(|p| p.as_str() == a) && players.iter().any(|p| p.as_str() == b) =>
                {
                    Some(*hand_id)
                }
                _ => None,
            })
            .collect();

        let checkdown_hands: Vec<HandId> = heads_up_hands
            .iter()
            .copied()
            .filter(|hand_id| {
                let went_to_showdown = events
                    .iter()
                    .any(|e| matches!(e, IntegrityEvent::PotAwarded { hand_id: h, went_to_showdown: true, .. } if h == hand_id));
                let any_raise = events
                    .iter()
                    .any(|e| matches!(e, IntegrityEvent::ActionTaken { hand_id: h, action: RecordedAction::Raise, .. } if h == hand_id));
                went_to_showdown && !any_raise
            })
            .collect();

        if checkdown_hands.len() as u64 >= thresholds.recurrence_threshold {
            let strength = (checkdown_hands.len() as f64 / heads_up_hands.len().max(1) as f64).min(1.0);
            indicators.push(DetectionIndicator {
                pattern: "coordinated_checkdowns".to_string(),
                strength,
                occurrences: checkdown_hands.len() as u64,
                expected_count: thresholds.recurrence_threshold as f64,
                z_score: checkdown_hands.len() as f64 - thresholds.recurrence_threshold as f64,
                involved_players: vec![a.clone(), b.clone()],
                affected_hands: checkdown_hands,
            });
        }
    }
    indicators
}

pub fn detect_all(events: &[IntegrityEvent], thresholds: &CollusionThresholds) -> Vec<DetectionIndicator> {
    let mut all = Vec::new();
    all.extend(detect_chip_concentration(events, thresholds));
    all.extend(detect_asymmetric_aggression(events, thresholds));
    all.extend(detect_abnormal_fold_pattern(events, thresholds));
    all.extend(detect_soft_play_heads_up(events, thresholds));
    all.extend(detect_coordinated_checkdowns(events, thresholds));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn hand_started(hand_id: u64, players: &[&str]) -> IntegrityEvent {
        IntegrityEvent::HandStarted {
            table_id: "t1".to_string(),
            hand_id,
            players: players.iter().map(|p| p.to_string()).collect(),
            dealer_seat: 0,
            recorded_at: Utc::now(),
        }
    }

    fn pot_awarded(hand_id: u64, winner: &str, contributors: &[&str], amount: u64, showdown: bool) -> IntegrityEvent {
        IntegrityEvent::PotAwarded {
            table_id: "t1".to_string(),
            hand_id,
            winner: winner.to_string(),
            amount,
            contributors: contributors.iter().map(|p| p.to_string()).collect(),
            went_to_showdown: showdown,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn chip_concentration_fires_when_all_losses_go_to_one_opponent() {
        let mut events = Vec::new();
        for hand_id in 1..=6 {
            events.push(hand_started(hand_id, &["hero", "villain"]));
            events.push(pot_awarded(hand_id, "villain", &["hero", "villain"], 100, true));
        }
        let indicators = detect_chip_concentration(&events, &CollusionThresholds::default());
        assert!(indicators.iter().any(|i| i.pattern == "chip_transfer_concentration" && i.involved_players.contains(&"hero".to_string())));
    }

    #[test]
    fn coordinated_checkdowns_require_recurrence() {
        let mut events = Vec::new();
        for hand_id in 1..=2 {
            events.push(hand_started(hand_id, &["hero", "villain"]));
            events.push(pot_awarded(hand_id, "hero", &["hero", "villain"], 50, true));
        }
        let indicators = detect_coordinated_checkdowns(&events, &CollusionThresholds::default());
        assert!(indicators.is_empty(), "two occurrences should not clear the default threshold of three");
    }
}

//! Soft-play patterns are judged against a player's own historical stats,
//! never an absolute threshold — the same aggression frequency can be
//! normal for one player and a sharp deviation for another.

use std::collections::HashSet;

use crate::economy::PlayerId;

use super::events::{IntegrityEvent, RecordedAction};
use super::metrics::{compute_player_metrics, TimingThresholds};
use super::signal::DetectionIndicator;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftPlayThresholds {
    pub min_sample_size: u64,
    /// Minimum deviation from the player's own global rate before a pattern
    /// is reported; suppresses false positives from ordinary variance.
    pub delta_threshold: f64,
}

impl Default for SoftPlayThresholds {
    fn default() -> Self {
        Self { min_sample_size: 10, delta_threshold: 0.25 }
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

fn river_facing_bet_actions<'a>(events: &'a [IntegrityEvent], player_id: &str) -> Vec<&'a IntegrityEvent> {
    events
        .iter()
        .filter(|e| {
            matches!(e, IntegrityEvent::ActionTaken { player_id: p, street: crate::engine::nl::types::Street::River, facing_bet: true, .. }
                if p.as_str() == player_id)
        })
        .collect()
}

/// Passive-in-high-EV: a player who folds to river pressure far more often
/// than their own overall fold-to-raise rate is playing unusually passively
/// exactly when chips are on the line.
pub fn detect_passive_in_high_ev(events: &[IntegrityEvent], thresholds: &SoftPlayThresholds) -> Vec<DetectionIndicator> {
    let mut indicators = Vec::new();
    for player_id in player_ids(events) {
        let river_spots = river_facing_bet_actions(events, &player_id);
        if river_spots.len() as u64 < thresholds.min_sample_size {
            continue;
        }
        let passive = river_spots
            .iter()
            .filter(|e| matches!(e, IntegrityEvent::ActionTaken { action: RecordedAction::Fold | RecordedAction::Call, .. }))
            .count() as f64;
        let local_passivity = passive / river_spots.len() as f64;

        let global = compute_player_metrics(events, &player_id, TimingThresholds::default());
        let global_passivity = 1.0 - global.aggression_frequency;
        let delta = local_passivity - global_passivity;
        if delta >= thresholds.delta_threshold {
            indicators.push(DetectionIndicator {
                pattern: "passive_in_high_ev".to_string(),
                strength: delta.min(1.0),
                occurrences: river_spots.len() as u64,
                expected_count: global_passivity * river_spots.len() as f64,
                z_score: delta,
                involved_players: vec![player_id],
                affected_hands: Vec::new(),
            });
        }
    }
    indicators
}

/// Missing value bet on river: the player checks the river without facing a
/// bet far more often than their own c-bet rate would predict, across
/// enough river spots to rule out a cold run of weak hands.
pub fn detect_missing_value_bet(events: &[IntegrityEvent], thresholds: &SoftPlayThresholds) -> Vec<DetectionIndicator> {
    let mut indicators = Vec::new();
    for player_id in player_ids(events) {
        let river_no_bet_spots: Vec<&IntegrityEvent> = events
            .iter()
            .filter(|e| {
                matches!(e, IntegrityEvent::ActionTaken { player_id: p, street: crate::engine::nl::types::Street::River, facing_bet: false, .. }
                    if p.as_str() == player_id)
            })
            .collect();
        if river_no_bet_spots.len() as u64 < thresholds.min_sample_size {
            continue;
        }
        let checks = river_no_bet_spots.iter().filter(|e| matches!(e, IntegrityEvent::ActionTaken { action: RecordedAction::Check, .. })).count() as f64;
        let local_check_rate = checks / river_no_bet_spots.len() as f64;

        let global = compute_player_metrics(events, &player_id, TimingThresholds::default());
        let expected_bet_rate = global.c_bet_rate;
        let delta = local_check_rate - (1.0 - expected_bet_rate);
        if delta >= thresholds.delta_threshold {
            indicators.push(DetectionIndicator {
                pattern: "missing_value_bet_on_river".to_string(),
                strength: delta.min(1.0),
                occurrences: river_no_bet_spots.len() as u64,
                expected_count: (1.0 - expected_bet_rate) * river_no_bet_spots.len() as f64,
                z_score: delta,
                involved_players: vec![player_id],
                affected_hands: Vec::new(),
            });
        }
    }
    indicators
}

/// Low-pressure heads-up: a player's own heads-up aggression collapses
/// relative to their multiway aggression.
pub fn detect_low_pressure_heads_up(events: &[IntegrityEvent], thresholds: &SoftPlayThresholds) -> Vec<DetectionIndicator> {
    let mut indicators = Vec::new();
    for player_id in player_ids(events) {
        let metrics = compute_player_metrics(events, &player_id, TimingThresholds::default());
        if metrics.hands_played < thresholds.min_sample_size {
            continue;
        }
        let delta = -metrics.heads_up_vs_multiway_delta;
        if delta >= thresholds.delta_threshold {
            indicators.push(DetectionIndicator {
                pattern: "low_pressure_heads_up".to_string(),
                strength: delta.min(1.0),
                occurrences: metrics.hands_played,
                expected_count: metrics.multiway_aggression_factor,
                z_score: delta,
                involved_players: vec![player_id],
                affected_hands: Vec::new(),
            });
        }
    }
    indicators
}

/// Abnormal check frequency against one specific opponent, versus the
/// player's own overall check frequency.
pub fn detect_abnormal_check_frequency(events: &[IntegrityEvent], thresholds: &SoftPlayThresholds) -> Vec<DetectionIndicator> {
    let ids = player_ids(events);
    let mut indicators = Vec::new();
    for player_id in &ids {
        for opponent in &ids {
            if player_id == opponent {
                continue;
            }
            let hands_with_opponent: HashSet<u64> = events
                .iter()
                .filter_map(|e| match e {
                    IntegrityEvent::HandStarted { hand_id, players, .. }
                        if players.iter().any(|p| p == player_id) && players.iter().any(|p| p == opponent) =>
                    {
                        Some(*hand_id)
                    }
                    _ => None,
                })
                .collect();
            let actions_vs_opponent: Vec<&IntegrityEvent> = events
                .iter()
                .filter(|e| matches!(e, IntegrityEvent::ActionTaken { player_id: p, hand_id, .. } if p == player_id && hands_with_opponent.contains(hand_id)))
                .collect();
            if actions_vs_opponent.len() as u64 < thresholds.min_sample_size {
                continue;
            }
            let checks = actions_vs_opponent.iter().filter(|e| matches!(e, IntegrityEvent::ActionTaken { action: RecordedAction::Check, .. })).count() as f64;
            let local_rate = checks / actions_vs_opponent.len() as f64;

            let global = compute_player_metrics(events, player_id, TimingThresholds::default());
            let global_check_rate = 1.0 - global.aggression_frequency;
            let delta = local_rate - global_check_rate;
            if delta >= thresholds.delta_threshold {
                indicators.push(DetectionIndicator {
                    pattern: "abnormal_check_frequency".to_string(),
                    strength: delta.min(1.0),
                    occurrences: actions_vs_opponent.len() as u64,
                    expected_count: global_check_rate * actions_vs_opponent.len() as f64,
                    z_score: delta,
                    involved_players: vec![player_id.clone(), opponent.clone()],
                    affected_hands: hands_with_opponent.into_iter().collect(),
                });
            }
        }
    }
    indicators
}

pub fn detect_all(events: &[IntegrityEvent], thresholds: &SoftPlayThresholds) -> Vec<DetectionIndicator> {
    let mut all = Vec::new();
    all.extend(detect_passive_in_high_ev(events, thresholds));
    all.extend(detect_missing_value_bet(events, thresholds));
    all.extend(detect_low_pressure_heads_up(events, thresholds));
    all.extend(detect_abnormal_check_frequency(events, thresholds));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::engine::nl::types::Street;

    fn hand_started(hand_id: u64, players: &[&str]) -> IntegrityEvent {
        IntegrityEvent::HandStarted {
            table_id: "t1".to_string(),
            hand_id,
            players: players.iter().map(|p| p.to_string()).collect(),
            dealer_seat: 0,
            recorded_at: Utc::now(),
        }
    }

    fn action(hand_id: u64, player: &str, street: Street, action: RecordedAction, facing_bet: bool) -> IntegrityEvent {
        IntegrityEvent::ActionTaken {
            table_id: "t1".to_string(),
            hand_id,
            player_id: player.to_string(),
            seat: 0,
            street,
            action,
            amount: 0,
            time_to_act_ms: 1_000,
            facing_bet,
            is_heads_up: true,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn passive_in_high_ev_requires_the_minimum_sample() {
        let mut events = Vec::new();
        for hand_id in 1..=3 {
            events.push(hand_started(hand_id, &["hero", "villain"]));
            events.push(action(hand_id, "hero", Street::River, RecordedAction::Fold, true));
        }
        let indicators = detect_passive_in_high_ev(&events, &SoftPlayThresholds::default());
        assert!(indicators.is_empty(), "3 river spots is below the default minimum of 10");
    }

    #[test]
    fn passive_in_high_ev_fires_once_sample_and_delta_clear() {
        let mut events = Vec::new();
        for hand_id in 1..=12 {
            events.push(hand_started(hand_id, &["hero", "villain"]));
            events.push(action(hand_id, "hero", Street::River, RecordedAction::Fold, true));
        }
        let indicators = detect_passive_in_high_ev(&events, &SoftPlayThresholds::default());
        assert!(indicators.iter().any(|i| i.pattern == "passive_in_high_ev"));
    }
}

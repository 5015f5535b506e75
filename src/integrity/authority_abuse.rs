//! Detects an authority (table host/admin) using its administrative powers
//! to its own financial advantage. All four patterns key off
//! `AuthorityIntervention` events, tagged by a `description` prefix the
//! authority-facing tooling is expected to populate consistently
//! (`"pause"`, `"config_change"`, `"kick"`); anything else is ignored.

use crate::economy::PlayerId;

use super::events::IntegrityEvent;
use super::metrics::chip_flow_matrix;
use super::signal::DetectionIndicator;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuthorityAbuseThresholds {
    pub min_occurrences: u64,
    /// Seconds a pause must fall within of a `facing_bet` action to count
    /// as suspicious timing.
    pub pause_correlation_window_secs: i64,
    pub config_change_correlation_window_secs: i64,
    /// Minimum win-rate improvement (post-intervention minus pre) to flag.
    pub win_rate_improvement_threshold: f64,
}

impl Default for AuthorityAbuseThresholds {
    fn default() -> Self {
        Self {
            min_occurrences: 2,
            pause_correlation_window_secs: 5,
            config_change_correlation_window_secs: 3_600,
            win_rate_improvement_threshold: 0.2,
        }
    }
}

fn interventions_tagged<'a>(events: &'a [IntegrityEvent], prefix: &str) -> Vec<&'a IntegrityEvent> {
    events
        .iter()
        .filter(|e| matches!(e, IntegrityEvent::AuthorityIntervention { description, .. } if description.starts_with(prefix)))
        .collect()
}

/// Authority pauses the table while a player is actively facing a bet, on
/// the same table, within a short window of the pause.
pub fn detect_suspicious_pause_timing(events: &[IntegrityEvent], thresholds: &AuthorityAbuseThresholds) -> Vec<DetectionIndicator> {
    let pauses = interventions_tagged(events, "pause");
    let mut flagged = Vec::new();
    for pause in &pauses {
        let IntegrityEvent::AuthorityIntervention { table_id, actor, recorded_at, .. } = pause else { continue };
        let co_occurring = events.iter().any(|e| {
            matches!(e, IntegrityEvent::ActionTaken { table_id: t, facing_bet: true, recorded_at: at, .. }
                if t == table_id && (*recorded_at - *at).num_seconds().abs() <= thresholds.pause_correlation_window_secs)
        });
        if co_occurring {
            flagged.push((actor.clone(), table_id.clone()));
        }
    }
    if flagged.len() as u64 < thresholds.min_occurrences {
        return Vec::new();
    }
    let actors: Vec<PlayerId> = flagged.iter().map(|(actor, _)| actor.clone()).collect();
    vec![DetectionIndicator {
        pattern: "suspicious_pause_timing".to_string(),
        strength: (flagged.len() as f64 / pauses.len().max(1) as f64).min(1.0),
        occurrences: flagged.len() as u64,
        expected_count: thresholds.min_occurrences as f64,
        z_score: flagged.len() as f64 - thresholds.min_occurrences as f64,
        involved_players: actors,
        affected_hands: Vec::new(),
    }]
}

/// A configuration change that follows the authority losing chips (as a
/// player) within the correlation window.
pub fn detect_config_change_after_loss(events: &[IntegrityEvent], thresholds: &AuthorityAbuseThresholds) -> Vec<DetectionIndicator> {
    let changes = interventions_tagged(events, "config_change");
    let mut flagged = Vec::new();
    for change in &changes {
        let IntegrityEvent::AuthorityIntervention { actor, recorded_at, .. } = change else { continue };
        let preceded_by_loss = events.iter().any(|e| {
            matches!(e, IntegrityEvent::PotAwarded { winner, contributors, recorded_at: at, .. }
                if winner != actor
                    && contributors.iter().any(|p| p == actor)
                    && *recorded_at >= *at
                    && (*recorded_at - *at).num_seconds() <= thresholds.config_change_correlation_window_secs)
        });
        if preceded_by_loss {
            flagged.push(actor.clone());
        }
    }
    if flagged.len() as u64 < thresholds.min_occurrences {
        return Vec::new();
    }
    vec![DetectionIndicator {
        pattern: "config_change_after_loss".to_string(),
        strength: (flagged.len() as f64 / changes.len().max(1) as f64).min(1.0),
        occurrences: flagged.len() as u64,
        expected_count: thresholds.min_occurrences as f64,
        z_score: flagged.len() as f64 - thresholds.min_occurrences as f64,
        involved_players: flagged,
        affected_hands: Vec::new(),
    }]
}

/// Authority kicks players who have previously won chips from it.
pub fn detect_selective_kicks(events: &[IntegrityEvent], thresholds: &AuthorityAbuseThresholds) -> Vec<DetectionIndicator> {
    let kicks = interventions_tagged(events, "kick");
    let flows = chip_flow_matrix(events);
    let mut flagged_players = Vec::new();
    for kick in &kicks {
        let IntegrityEvent::AuthorityIntervention { actor, affected_player: Some(target), .. } = kick else { continue };
        let authority_lost_to_target = flows.get(&(actor.clone(), target.clone())).copied().unwrap_or(0) > 0;
        if authority_lost_to_target {
            flagged_players.push(target.clone());
        }
    }
    if flagged_players.len() as u64 < thresholds.min_occurrences {
        return Vec::new();
    }
    vec![DetectionIndicator {
        pattern: "selective_kicks".to_string(),
        strength: (flagged_players.len() as f64 / kicks.len().max(1) as f64).min(1.0),
        occurrences: flagged_players.len() as u64,
        expected_count: thresholds.min_occurrences as f64,
        z_score: flagged_players.len() as f64 - thresholds.min_occurrences as f64,
        involved_players: flagged_players,
        affected_hands: Vec::new(),
    }]
}

/// The authority's own per-hand win-rate, as a contributor-or-winner in
/// `pot_awarded` events, before vs after its first recorded intervention.
pub fn detect_intervention_correlation(events: &[IntegrityEvent], thresholds: &AuthorityAbuseThresholds) -> Vec<DetectionIndicator> {
    let mut indicators = Vec::new();
    let authorities: Vec<PlayerId> = {
        let mut seen = std::collections::HashSet::new();
        events
            .iter()
            .filter_map(|e| match e {
                IntegrityEvent::AuthorityIntervention { actor, .. } if seen.insert(actor.clone()) => Some(actor.clone()),
                _ => None,
            })
            .collect()
    };

    for authority in authorities {
        let first_intervention = events
            .iter()
            .filter_map(|e| match e {
                IntegrityEvent::AuthorityIntervention { actor, recorded_at, .. } if actor == &authority => Some(*recorded_at),
                _ => None,
            })
            .min();
        let Some(first_intervention) = first_intervention else { continue };

        let pots: Vec<&IntegrityEvent> = events
            .iter()
            .filter(|e| matches!(e, IntegrityEvent::PotAwarded { contributors, .. } if contributors.iter().any(|p| p == &authority)))
            .collect();
        let before: Vec<&&IntegrityEvent> = pots.iter().filter(|e| e.recorded_at() < first_intervention).collect();
        let after: Vec<&&IntegrityEvent> = pots.iter().filter(|e| e.recorded_at() >= first_intervention).collect();
        if before.len() < thresholds.min_occurrences as usize || after.len() < thresholds.min_occurrences as usize {
            continue;
        }

        let win_rate = |pots: &[&&IntegrityEvent]| -> f64 {
            let wins = pots.iter().filter(|e| matches!(e, IntegrityEvent::PotAwarded { winner, .. } if winner == &authority)).count();
            wins as f64 / pots.len() as f64
        };
        let before_rate = win_rate(&before);
        let after_rate = win_rate(&after);
        let improvement = after_rate - before_rate;
        if improvement >= thresholds.win_rate_improvement_threshold {
            indicators.push(DetectionIndicator {
                pattern: "intervention_correlation".to_string(),
                strength: improvement.min(1.0),
                occurrences: after.len() as u64,
                expected_count: before_rate * after.len() as f64,
                z_score: improvement,
                involved_players: vec![authority],
                affected_hands: Vec::new(),
            });
        }
    }
    indicators
}

pub fn detect_all(events: &[IntegrityEvent], thresholds: &AuthorityAbuseThresholds) -> Vec<DetectionIndicator> {
    let mut all = Vec::new();
    all.extend(detect_suspicious_pause_timing(events, thresholds));
    all.extend(detect_config_change_after_loss(events, thresholds));
    all.extend(detect_selective_kicks(events, thresholds));
    all.extend(detect_intervention_correlation(events, thresholds));
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn intervention(actor: &str, description: &str, affected: Option<&str>, at: chrono::DateTime<Utc>) -> IntegrityEvent {
        IntegrityEvent::AuthorityIntervention {
            table_id: "t1".to_string(),
            actor: actor.to_string(),
            description: description.to_string(),
            affected_player: affected.map(|p| p.to_string()),
            recorded_at: at,
        }
    }

    #[test]
    fn selective_kicks_requires_prior_loss_to_the_target() {
        let now = Utc::now();
        let events = vec![
            IntegrityEvent::PotAwarded {
                table_id: "t1".to_string(),
                hand_id: 1,
                winner: "hero".to_string(),
                amount: 50,
                contributors: vec!["hero".to_string(), "host".to_string()],
                went_to_showdown: true,
                recorded_at: now,
            },
            intervention("host", "kick: hero", Some("hero"), now + chrono::Duration::seconds(10)),
            IntegrityEvent::PotAwarded {
                table_id: "t1".to_string(),
                hand_id: 2,
                winner: "hero".to_string(),
                amount: 50,
                contributors: vec!["hero".to_string(), "host".to_string()],
                went_to_showdown: true,
                recorded_at: now + chrono::Duration::seconds(20),
            },
            intervention("host", "kick: hero", Some("hero"), now + chrono::Duration::seconds(30)),
        ];
        let indicators = detect_selective_kicks(&events, &AuthorityAbuseThresholds::default());
        assert_eq!(indicators.len(), 1);
        assert_eq!(indicators[0].involved_players, vec!["hero".to_string()]);
    }

    #[test]
    fn suspicious_pause_timing_ignores_unrelated_interventions() {
        let now = Utc::now();
        let events = vec![intervention("host", "note: table felt slow", None, now)];
        let indicators = detect_suspicious_pause_timing(&events, &AuthorityAbuseThresholds::default());
        assert!(indicators.is_empty());
    }
}

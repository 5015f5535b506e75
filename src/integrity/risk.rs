//! Aggregates every detector's indicators and the per-player metrics into a
//! single table-level report with a [0,100] risk score and a discrete risk
//! level.

use serde::{Deserialize, Serialize};

use crate::economy::{PlayerId, TableId};

use super::authority_abuse::{self, AuthorityAbuseThresholds};
use super::collusion::{self, CollusionThresholds};
use super::events::IntegrityEvent;
use super::metrics::{compute_player_metrics, PlayerMetrics, TimingThresholds};
use super::signal::{to_signal, DetectionSignal};
use super::softplay::{self, SoftPlayThresholds};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Clean,
    LowRisk,
    ModerateRisk,
    HighRisk,
    Critical,
}

fn risk_level_for_score(score: f64) -> RiskLevel {
    if score >= 80.0 {
        RiskLevel::Critical
    } else if score >= 60.0 {
        RiskLevel::HighRisk
    } else if score >= 30.0 {
        RiskLevel::ModerateRisk
    } else if score > 0.0 {
        RiskLevel::LowRisk
    } else {
        RiskLevel::Clean
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlayerRiskReport {
    pub player_id: PlayerId,
    pub metrics: PlayerMetrics,
    pub signals: Vec<DetectionSignal>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableRiskReport {
    pub table_id: TableId,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub player_reports: Vec<PlayerRiskReport>,
    pub collusion_signals: Vec<DetectionSignal>,
    pub soft_play_signals: Vec<DetectionSignal>,
    pub authority_abuse_signals: Vec<DetectionSignal>,
}

fn average_strength(signals: &[DetectionSignal]) -> f64 {
    if signals.is_empty() {
        return 0.0;
    }
    signals.iter().map(|s| s.indicator.strength).sum::<f64>() / signals.len() as f64
}

/// Weighted aggregate of the three detector families, scaled to [0, 100]
/// and boosted if at least two players individually carry a high-strength
/// signal of their own.
pub struct RiskReportEngine {
    pub collusion_thresholds: CollusionThresholds,
    pub soft_play_thresholds: SoftPlayThresholds,
    pub authority_abuse_thresholds: AuthorityAbuseThresholds,
    pub timing_thresholds: TimingThresholds,
}

impl Default for RiskReportEngine {
    fn default() -> Self {
        Self {
            collusion_thresholds: CollusionThresholds::default(),
            soft_play_thresholds: SoftPlayThresholds::default(),
            authority_abuse_thresholds: AuthorityAbuseThresholds::default(),
            timing_thresholds: TimingThresholds::default(),
        }
    }
}

impl RiskReportEngine {
    pub fn generate_report(&self, table_id: &str, events: &[IntegrityEvent]) -> TableRiskReport {
        let table_events: Vec<IntegrityEvent> = events.iter().filter(|e| e.table_id() == table_id).cloned().collect();

        let collusion_indicators = collusion::detect_all(&table_events, &self.collusion_thresholds);
        let soft_play_indicators = softplay::detect_all(&table_events, &self.soft_play_thresholds);
        let authority_abuse_indicators = authority_abuse::detect_all(&table_events, &self.authority_abuse_thresholds);

        let collusion_signals: Vec<DetectionSignal> = collusion_indicators.into_iter().map(to_signal).collect();
        let soft_play_signals: Vec<DetectionSignal> = soft_play_indicators.into_iter().map(to_signal).collect();
        let authority_abuse_signals: Vec<DetectionSignal> = authority_abuse_indicators.into_iter().map(to_signal).collect();

        let collusion_score = average_strength(&collusion_signals);
        let soft_play_score = average_strength(&soft_play_signals);
        let authority_abuse_score = average_strength(&authority_abuse_signals);

        let weighted = collusion_score * 0.3 + soft_play_score * 0.2 + authority_abuse_score * 0.25;
        let weight_sum = 0.3 + 0.2 + 0.25;
        let normalized = (weighted / weight_sum).clamp(0.0, 1.0);
        let mut score = normalized * 100.0;

        let player_ids = player_ids_in(&table_events);
        let player_reports: Vec<PlayerRiskReport> = player_ids
            .iter()
            .map(|player_id| {
                let metrics = compute_player_metrics(&table_events, player_id, self.timing_thresholds);
                let signals: Vec<DetectionSignal> = collusion_signals
                    .iter()
                    .chain(soft_play_signals.iter())
                    .chain(authority_abuse_signals.iter())
                    .filter(|s| s.indicator.involved_players.iter().any(|p| p == player_id))
                    .cloned()
                    .collect();
                PlayerRiskReport { player_id: player_id.clone(), metrics, signals }
            })
            .collect();

        let high_risk_players = player_reports.iter().filter(|r| r.signals.iter().any(|s| s.indicator.strength >= 0.6)).count();
        if high_risk_players >= 2 {
            score = (score * 1.25).min(100.0);
        }

        let evidence_count = collusion_signals.len() + soft_play_signals.len() + authority_abuse_signals.len();
        let confidence = (evidence_count as f64 / 5.0).min(1.0);

        TableRiskReport {
            table_id: table_id.to_string(),
            risk_score: score,
            risk_level: risk_level_for_score(score),
            confidence,
            player_reports,
            collusion_signals,
            soft_play_signals,
            authority_abuse_signals,
        }
    }
}

fn player_ids_in(events: &[IntegrityEvent]) -> Vec<PlayerId> {
    let mut seen = std::collections::HashSet::new();
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

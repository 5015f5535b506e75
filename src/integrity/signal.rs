//! Shared detection vocabulary: every detector (collusion, soft-play,
//! authority-abuse) emits `DetectionIndicator`s in this shape, and they all
//! convert to a `DetectionSignal` the same way.

use serde::{Deserialize, Serialize};

use crate::economy::{HandId, PlayerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// One rule firing, with enough context for a human reviewer to judge it
/// without re-deriving the underlying events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionIndicator {
    pub pattern: String,
    /// In [0, 1]; how strongly the observed data matches the pattern.
    pub strength: f64,
    pub occurrences: u64,
    pub expected_count: f64,
    pub z_score: f64,
    pub involved_players: Vec<PlayerId>,
    pub affected_hands: Vec<HandId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionSignal {
    pub severity: Severity,
    pub indicator: DetectionIndicator,
}

/// Strength -> severity band: [0, 0.4) low, [0.4, 0.6) medium, [0.6, 0.8)
/// high, [0.8, 1.0] critical.
pub fn severity_for_strength(strength: f64) -> Severity {
    if strength >= 0.8 {
        Severity::Critical
    } else if strength >= 0.6 {
        Severity::High
    } else if strength >= 0.4 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn to_signal(indicator: DetectionIndicator) -> DetectionSignal {
    let severity = severity_for_strength(indicator.strength);
    DetectionSignal { severity, indicator }
}

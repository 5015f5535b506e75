//! Append-only hash chain of moderator actions. Every case transition and
//! every evidence read goes through `DecisionLogger::append`, so the chain
//! is a complete, tamper-evident audit trail independent of whatever
//! mutable case state lives alongside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hash::{decision_entry_hash, genesis_decision_hash};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionActionType {
    CaseOpened,
    CaseAssigned,
    Annotated,
    BundleViewed,
    ReplayViewed,
    RecommendationMade,
    Resolved,
    Dismissed,
    Escalated,
    Reopened,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub entry_id: u64,
    pub timestamp: DateTime<Utc>,
    pub moderator_id: String,
    pub action_type: DecisionActionType,
    pub case_id: String,
    pub details: String,
    pub previous_entry_hash: String,
    pub entry_hash: String,
}

fn action_tag(action: DecisionActionType) -> &'static str {
    match action {
        DecisionActionType::CaseOpened => "case_opened",
        DecisionActionType::CaseAssigned => "case_assigned",
        DecisionActionType::Annotated => "annotated",
        DecisionActionType::BundleViewed => "bundle_viewed",
        DecisionActionType::ReplayViewed => "replay_viewed",
        DecisionActionType::RecommendationMade => "recommendation_made",
        DecisionActionType::Resolved => "resolved",
        DecisionActionType::Dismissed => "dismissed",
        DecisionActionType::Escalated => "escalated",
        DecisionActionType::Reopened => "reopened",
    }
}

/// One chain per case, rooted at a genesis hash derived from the case id so
/// two cases' chains never collide even if their entries happen to match.
pub struct DecisionLogger {
    case_id: String,
    entries: Vec<DecisionLogEntry>,
    next_entry_id: u64,
}

impl DecisionLogger {
    pub fn new(case_id: String) -> Self {
        Self { case_id, entries: Vec::new(), next_entry_id: 1 }
    }

    fn previous_hash(&self) -> String {
        self.entries.last().map(|e| e.entry_hash.clone()).unwrap_or_else(|| genesis_decision_hash(&self.case_id))
    }

    pub fn append(
        &mut self,
        moderator_id: &str,
        action_type: DecisionActionType,
        details: &str,
        timestamp: DateTime<Utc>,
    ) -> &DecisionLogEntry {
        let previous_entry_hash = self.previous_hash();
        let entry_id = self.next_entry_id;
        let entry_hash =
            decision_entry_hash(entry_id, timestamp.timestamp_millis(), moderator_id, action_tag(action_type), &self.case_id, details, &previous_entry_hash);
        self.entries.push(DecisionLogEntry {
            entry_id,
            timestamp,
            moderator_id: moderator_id.to_string(),
            action_type,
            case_id: self.case_id.clone(),
            details: details.to_string(),
            previous_entry_hash,
            entry_hash,
        });
        self.next_entry_id += 1;
        self.entries.last().expect("just pushed")
    }

    pub fn entries(&self) -> &[DecisionLogEntry] {
        &self.entries
    }

    /// Walks the chain, confirming each entry's `previous_entry_hash`
    /// matches its predecessor's `entry_hash` (or the genesis hash for the
    /// first entry) and that each entry's own hash recomputes correctly.
    pub fn verify_integrity(&self) -> bool {
        let mut expected_previous = genesis_decision_hash(&self.case_id);
        for entry in &self.entries {
            if entry.previous_entry_hash != expected_previous {
                return false;
            }
            let recomputed = decision_entry_hash(
                entry.entry_id,
                entry.timestamp.timestamp_millis(),
                &entry.moderator_id,
                action_tag(entry.action_type),
                &entry.case_id,
                &entry.details,
                &entry.previous_entry_hash,
            );
            if recomputed != entry.entry_hash {
                return false;
            }
            expected_previous = entry.entry_hash.clone();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_fresh_chain_of_appends_verifies() {
        let mut log = DecisionLogger::new("case-1".to_string());
        log.append("mod1", DecisionActionType::CaseOpened, "opened from risk report", Utc::now());
        log.append("mod1", DecisionActionType::Annotated, "reviewed replay", Utc::now());
        log.append("mod1", DecisionActionType::Resolved, "warning issued", Utc::now());
        assert!(log.verify_integrity());
        assert_eq!(log.entries().len(), 3);
    }

    #[test]
    fn rewriting_an_entrys_details_breaks_the_chain() {
        let mut log = DecisionLogger::new("case-1".to_string());
        log.append("mod1", DecisionActionType::CaseOpened, "opened", Utc::now());
        log.append("mod1", DecisionActionType::Resolved, "closed", Utc::now());
        assert!(log.verify_integrity());

        let mut tampered = log.entries().to_vec();
        tampered[0].details = "tampered".to_string();
        let log2 = DecisionLogger { case_id: "case-1".to_string(), entries: tampered, next_entry_id: 3 };
        assert!(!log2.verify_integrity());
    }

    #[test]
    fn two_different_cases_never_share_a_genesis_hash() {
        let a = DecisionLogger::new("case-a".to_string());
        let b = DecisionLogger::new("case-b".to_string());
        assert_ne!(a.previous_hash(), b.previous_hash());
    }
}

//! Moderator case workflow: a strict state machine over a risk-report or
//! player-report finding. Every transition, and every evidence read, is
//! logged to the case's `DecisionLogger` chain so the audit trail survives
//! independently of the mutable case record. Nothing here touches the
//! event stream, the ledger, or authority state — a case can only read
//! evidence, never change it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::decision_log::{DecisionActionType, DecisionLogger};
use super::evidence::EvidenceBundle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    PendingReview,
    UnderInvestigation,
    AwaitingDecision,
    Resolved,
    Dismissed,
    Escalated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseDecision {
    Resolved,
    Dismissed,
    Escalated,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CaseAnnotation {
    pub moderator_id: String,
    pub note: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModerationCase {
    pub case_id: String,
    pub table_id: String,
    pub opened_reason: String,
    pub status: CaseStatus,
    pub assigned_moderator: Option<String>,
    pub annotations: Vec<CaseAnnotation>,
    pub recommendation: Option<String>,
    pub opened_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CaseError {
    #[error("case {case_id} is in status {status:?}, which does not permit this transition")]
    InvalidTransition { case_id: String, status: CaseStatus },
    #[error("case {case_id} has no assigned moderator")]
    Unassigned { case_id: String },
}

/// One case plus its append-only decision chain. Owned by `ModeratorService`,
/// which is the only thing allowed to construct or mutate it.
pub struct CaseRecord {
    pub case: ModerationCase,
    pub log: DecisionLogger,
}

pub struct ModeratorService;

impl ModeratorService {
    pub fn open_case(case_id: String, table_id: String, opened_reason: String, opened_at: DateTime<Utc>) -> CaseRecord {
        let mut log = DecisionLogger::new(case_id.clone());
        log.append("system", DecisionActionType::CaseOpened, &opened_reason, opened_at);
        let case = ModerationCase {
            case_id,
            table_id,
            opened_reason,
            status: CaseStatus::PendingReview,
            assigned_moderator: None,
            annotations: Vec::new(),
            recommendation: None,
            opened_at,
        };
        CaseRecord { case, log }
    }

    pub fn assign(record: &mut CaseRecord, moderator_id: &str, now: DateTime<Utc>) -> Result<(), CaseError> {
        if record.case.status != CaseStatus::PendingReview {
            return Err(CaseError::InvalidTransition { case_id: record.case.case_id.clone(), status: record.case.status });
        }
        record.case.status = CaseStatus::UnderInvestigation;
        record.case.assigned_moderator = Some(moderator_id.to_string());
        record.log.append(moderator_id, DecisionActionType::CaseAssigned, "assigned for investigation", now);
        Ok(())
    }

    pub fn annotate(record: &mut CaseRecord, moderator_id: &str, note: &str, now: DateTime<Utc>) -> Result<(), CaseError> {
        if record.case.status != CaseStatus::UnderInvestigation {
            return Err(CaseError::InvalidTransition { case_id: record.case.case_id.clone(), status: record.case.status });
        }
        record.case.annotations.push(CaseAnnotation { moderator_id: moderator_id.to_string(), note: note.to_string(), recorded_at: now });
        record.log.append(moderator_id, DecisionActionType::Annotated, note, now);
        Ok(())
    }

    /// Logs a read of the hand replay without changing case state.
    pub fn view_replay(record: &mut CaseRecord, moderator_id: &str, hand_id: u64, now: DateTime<Utc>) {
        record.log.append(moderator_id, DecisionActionType::ReplayViewed, &format!("viewed replay for hand {hand_id}"), now);
    }

    /// Logs a read of an evidence bundle without changing case state.
    pub fn view_bundle(record: &mut CaseRecord, moderator_id: &str, bundle: &EvidenceBundle, now: DateTime<Utc>) {
        record.log.append(moderator_id, DecisionActionType::BundleViewed, &format!("viewed bundle {}", bundle.bundle_id), now);
    }

    pub fn recommend(record: &mut CaseRecord, moderator_id: &str, recommendation: &str, now: DateTime<Utc>) -> Result<(), CaseError> {
        if record.case.status != CaseStatus::UnderInvestigation {
            return Err(CaseError::InvalidTransition { case_id: record.case.case_id.clone(), status: record.case.status });
        }
        record.case.status = CaseStatus::AwaitingDecision;
        record.case.recommendation = Some(recommendation.to_string());
        record.log.append(moderator_id, DecisionActionType::RecommendationMade, recommendation, now);
        Ok(())
    }

    pub fn decide(record: &mut CaseRecord, moderator_id: &str, decision: CaseDecision, details: &str, now: DateTime<Utc>) -> Result<(), CaseError> {
        if record.case.status != CaseStatus::AwaitingDecision {
            return Err(CaseError::InvalidTransition { case_id: record.case.case_id.clone(), status: record.case.status });
        }
        let (status, action) = match decision {
            CaseDecision::Resolved => (CaseStatus::Resolved, DecisionActionType::Resolved),
            CaseDecision::Dismissed => (CaseStatus::Dismissed, DecisionActionType::Dismissed),
            CaseDecision::Escalated => (CaseStatus::Escalated, DecisionActionType::Escalated),
        };
        record.case.status = status;
        record.log.append(moderator_id, action, details, now);
        Ok(())
    }

    /// Reopens a closed case back into active investigation. Per policy,
    /// only resolved or dismissed cases can be reopened; an escalated case
    /// stays escalated until the escalation target acts on it.
    pub fn reopen(record: &mut CaseRecord, moderator_id: &str, reason: &str, now: DateTime<Utc>) -> Result<(), CaseError> {
        if !matches!(record.case.status, CaseStatus::Resolved | CaseStatus::Dismissed) {
            return Err(CaseError::InvalidTransition { case_id: record.case.case_id.clone(), status: record.case.status });
        }
        record.case.status = CaseStatus::UnderInvestigation;
        record.log.append(moderator_id, DecisionActionType::Reopened, reason, now);
        Ok(())
    }
}

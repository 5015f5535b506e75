//! Wire shapes for the diagnostics API. Domain types (`TableRiskReport`,
//! `HandReplay`, `EvidenceBundle`, `ModerationCase`, `DecisionLogEntry`)
//! already derive `Serialize` and are returned as-is; this module only adds
//! the request bodies and small list wrappers the routes need.

use serde::{Deserialize, Serialize};

use crate::moderation::{CaseDecision, DecisionLogEntry, ModerationCase};

#[derive(Debug, Serialize)]
pub struct RoomListResponse {
    pub room_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CaseListResponse {
    pub case_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CaseDetailResponse {
    pub case: ModerationCase,
    pub log: Vec<DecisionLogEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OpenCaseRequest {
    pub table_id: String,
    pub opened_reason: String,
}

#[derive(Debug, Serialize)]
pub struct OpenCaseResponse {
    pub case_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ModeratorRequest {
    pub moderator_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AnnotateRequest {
    pub moderator_id: String,
    pub note: String,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub moderator_id: String,
    pub recommendation: String,
}

#[derive(Debug, Deserialize)]
pub struct DecideRequest {
    pub moderator_id: String,
    pub decision: CaseDecision,
    pub details: String,
}

#[derive(Debug, Deserialize)]
pub struct ReopenRequest {
    pub moderator_id: String,
    pub reason: String,
}

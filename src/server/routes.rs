use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};

use crate::economy::HandId;
use crate::integrity::RiskReportEngine;
use crate::moderation::{EvidenceBundle, EvidenceBundleBuilder, HandReplay, HandReplayEngine, TableContext};
use crate::runtime::PokerRuntime;

use super::dto::{
    AnnotateRequest, CaseDetailResponse, CaseListResponse, DecideRequest, ModeratorRequest, OpenCaseRequest, OpenCaseResponse,
    RecommendRequest, ReopenRequest, RoomListResponse,
};
use super::error::ApiError;

#[derive(Clone)]
pub struct ServerContext {
    pub runtime: Arc<PokerRuntime>,
    pub risk_engine: Arc<RiskReportEngine>,
}

/// A read-mostly diagnostics surface over a `PokerRuntime`: open rooms,
/// per-table risk reports, hand replays, evidence bundles, and the
/// moderation case workflow. This is not the client wire protocol — players
/// talk to a room's serializer directly over its mailbox/broadcast pair;
/// this router exists for operators and moderators.
pub struct RoomAuthorityServer {
    router: Router,
}

impl RoomAuthorityServer {
    pub fn new(runtime: Arc<PokerRuntime>) -> Self {
        let context = ServerContext { runtime, risk_engine: Arc::new(RiskReportEngine::default()) };

        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

        let router = Router::new()
            .route("/health", get(health))
            .route("/rooms", get(list_rooms))
            .route("/tables/:table_id/risk", get(table_risk_report))
            .route("/tables/:table_id/hands/:hand_id/replay", get(hand_replay))
            .route("/tables/:table_id/hands/:hand_id/evidence", get(hand_evidence))
            .route("/cases", get(list_cases).post(open_case))
            .route("/cases/:case_id", get(case_detail))
            .route("/cases/:case_id/assign", post(assign_case))
            .route("/cases/:case_id/annotate", post(annotate_case))
            .route("/cases/:case_id/recommend", post(recommend_case))
            .route("/cases/:case_id/decide", post(decide_case))
            .route("/cases/:case_id/reopen", post(reopen_case))
            .layer(Extension(Arc::new(context)))
            .layer(middleware::from_fn(super::logging::log_requests))
            .layer(cors);

        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn list_rooms(Extension(ctx): Extension<Arc<ServerContext>>) -> Json<RoomListResponse> {
    Json(RoomListResponse { room_ids: ctx.runtime.room_ids() })
}

async fn table_risk_report(Extension(ctx): Extension<Arc<ServerContext>>, Path(table_id): Path<String>) -> Json<crate::integrity::TableRiskReport> {
    let events = ctx.runtime.integrity().lock().by_table(&table_id);
    Json(ctx.risk_engine.generate_report(&table_id, &events))
}

async fn hand_replay(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path((table_id, hand_id)): Path<(String, HandId)>,
) -> Result<Json<HandReplay>, ApiError> {
    let events = ctx.runtime.integrity().lock().by_table(&table_id);
    let replay = HandReplayEngine::replay(&events, &table_id, hand_id)
        .ok_or_else(|| ApiError::not_found(format!("no hand {hand_id} recorded for table {table_id}")))?;
    Ok(Json(replay))
}

async fn hand_evidence(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path((table_id, hand_id)): Path<(String, HandId)>,
) -> Result<Json<EvidenceBundle>, ApiError> {
    let events = ctx.runtime.integrity().lock().by_table(&table_id);
    let report = ctx.risk_engine.generate_report(&table_id, &events);
    let player_ids: Vec<String> = report.player_reports.iter().map(|r| r.player_id.clone()).collect();
    let player_metrics = report.player_reports.iter().map(|r| r.metrics.clone()).collect();
    let detection_signals: Vec<_> = report.player_reports.iter().flat_map(|r| r.signals.clone()).collect();

    let room = ctx.runtime.config().room.clone();
    let table_context = TableContext { table_id: table_id.clone(), stakes_small_blind: room.small_blind, stakes_big_blind: room.big_blind, player_count: player_ids.len() };

    let bundle = EvidenceBundleBuilder::build(
        format!("{table_id}-{hand_id}"),
        &table_id,
        hand_id,
        &events,
        &player_ids,
        player_metrics,
        detection_signals,
        table_context,
        Utc::now(),
    )?;
    Ok(Json(bundle))
}

async fn list_cases(Extension(ctx): Extension<Arc<ServerContext>>) -> Json<CaseListResponse> {
    Json(CaseListResponse { case_ids: ctx.runtime.case_ids() })
}

async fn open_case(Extension(ctx): Extension<Arc<ServerContext>>, Json(payload): Json<OpenCaseRequest>) -> Json<OpenCaseResponse> {
    let case_id = ctx.runtime.open_case(payload.table_id, payload.opened_reason);
    Json(OpenCaseResponse { case_id })
}

async fn case_detail(Extension(ctx): Extension<Arc<ServerContext>>, Path(case_id): Path<String>) -> Result<Json<CaseDetailResponse>, ApiError> {
    let case = ctx.runtime.case_snapshot(&case_id).ok_or_else(|| ApiError::not_found(format!("unknown case {case_id}")))?;
    let log = ctx.runtime.case_log(&case_id).unwrap_or_default();
    Ok(Json(CaseDetailResponse { case, log }))
}

async fn assign_case(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(case_id): Path<String>,
    Json(payload): Json<ModeratorRequest>,
) -> Result<(), ApiError> {
    ctx.runtime.assign_case(&case_id, &payload.moderator_id)?;
    Ok(())
}

async fn annotate_case(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(case_id): Path<String>,
    Json(payload): Json<AnnotateRequest>,
) -> Result<(), ApiError> {
    ctx.runtime.annotate_case(&case_id, &payload.moderator_id, &payload.note)?;
    Ok(())
}

async fn recommend_case(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(case_id): Path<String>,
    Json(payload): Json<RecommendRequest>,
) -> Result<(), ApiError> {
    ctx.runtime.recommend_case(&case_id, &payload.moderator_id, &payload.recommendation)?;
    Ok(())
}

async fn decide_case(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(case_id): Path<String>,
    Json(payload): Json<DecideRequest>,
) -> Result<(), ApiError> {
    ctx.runtime.decide_case(&case_id, &payload.moderator_id, payload.decision, &payload.details)?;
    Ok(())
}

async fn reopen_case(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(case_id): Path<String>,
    Json(payload): Json<ReopenRequest>,
) -> Result<(), ApiError> {
    ctx.runtime.reopen_case(&case_id, &payload.moderator_id, &payload.reason)?;
    Ok(())
}

//! Read-mostly diagnostics HTTP surface over a `PokerRuntime`: room listing,
//! per-table risk reports, hand replays, evidence bundles, and the
//! moderation case workflow. Not the client wire protocol — that lives on
//! each room's own mailbox/broadcast pair.

mod dto;
mod error;
mod logging;
pub mod routes;

pub use error::ApiError;
pub use routes::{RoomAuthorityServer, ServerContext};

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use crate::runtime::PokerRuntime;

const LOG_TARGET: &str = "poker_room_authority::server::bootstrap";

pub async fn run_server(bind: std::net::SocketAddr, runtime: Arc<PokerRuntime>) -> anyhow::Result<()> {
    let server = RoomAuthorityServer::new(runtime);
    let router = server.into_router();

    let listener = TcpListener::bind(bind).await.with_context(|| format!("failed to bind {bind}"))?;
    let local_addr = listener.local_addr()?;
    info!(target: LOG_TARGET, %local_addr, "diagnostics server listening");

    axum::serve(listener, router.into_make_service()).with_graceful_shutdown(shutdown_signal()).await.context("server exited with error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(target: LOG_TARGET, %err, "failed to install ctrl-c handler");
    }
    info!(target: LOG_TARGET, "shutdown signal received");
}

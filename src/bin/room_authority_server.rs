use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use poker_room_authority::config::Args;
use poker_room_authority::room::card::HighCardSumEvaluator;
use poker_room_authority::runtime::PokerRuntime;
use poker_room_authority::server;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json)?;

    let bind = args.bind;
    let config = args.into_runtime_config();
    let runtime = Arc::new(PokerRuntime::with_system_clock(config, Arc::new(HighCardSumEvaluator)));

    server::run_server(bind, runtime).await.context("diagnostics server exited with error")
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt::fmt().with_env_filter(filter).with_target(false);

    if json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }

    Ok(())
}

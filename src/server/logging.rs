use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

const LOG_TARGET: &str = "poker_room_authority::server::http";

/// Logs method/path/query on entry and status/duration on exit.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let path = uri.path().to_string();
    let query = uri.query().unwrap_or("").to_string();

    if query.is_empty() {
        tracing::info!(target: LOG_TARGET, %method, %path, "incoming request");
    } else {
        tracing::info!(target: LOG_TARGET, %method, %path, %query, "incoming request");
    }

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        target: LOG_TARGET,
        %method,
        %path,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "request completed"
    );

    response
}

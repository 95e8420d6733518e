// crates/wrapper/src/routes/mod.rs
//! HTTP surface of the gateway.

pub mod chat;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use coach_observability::metrics::metrics_handler;

use crate::state::WrapperState;

/// Handler budget for `POST`/`DELETE /api/v1/chat`. Agent turns with
/// speech synthesis can take most of it.
pub const REST_TIMEOUT: Duration = Duration::from_secs(60);

/// GET /health
pub async fn health_check() -> &'static str {
    "ok"
}

/// Routes:
/// - GET /health, GET /metrics
/// - POST /api/v1/chat - One prompt, text (and audio) reply
/// - DELETE /api/v1/chat - Replace the user's session
/// - GET /api/v1/chat/stream - Live audio WebSocket to the agent
pub fn api_routes(state: Arc<WrapperState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", chat::router(REST_TIMEOUT))
        .with_state(state)
}

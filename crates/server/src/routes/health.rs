// crates/server/src/routes/health.rs
//! Liveness probe.

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::state::AppState;

/// GET /health - plain `OK` while the process serves requests.
pub async fn health_check() -> &'static str {
    "OK"
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

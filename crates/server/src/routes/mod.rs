// crates/server/src/routes/mod.rs
//! API route handlers for the coach backend.

pub mod catalog;
pub mod events;
pub mod health;
pub mod plans;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use coach_observability::{metrics::metrics_handler, with_request_timeout};

use crate::state::AppState;

/// Handler budget for the REST routes. The event socket is exempt.
pub const REST_TIMEOUT: Duration = Duration::from_secs(60);

/// Combined router.
///
/// Routes:
/// - GET /health - Liveness probe
/// - GET /metrics - Prometheus metrics
/// - GET /api/v1/categories[/{id}] - Catalog categories
/// - GET /api/v1/drills[/{id}] - Catalog drills
/// - GET /api/v1/plan-templates[/{id}] - Plan templates
/// - POST /api/v1/daily-plans/initiate - Create today's plan
/// - GET /api/v1/daily-plans/{date} - Plan for a day (`today` auto-creates)
/// - PUT /api/v1/daily-plans/today - Merge a partial update and broadcast it
/// - GET /api/v1/ws?email= - Plan event WebSocket
pub fn api_routes(state: Arc<AppState>) -> Router {
    let rest = with_request_timeout(
        Router::new().merge(catalog::router()).merge(plans::router()),
        REST_TIMEOUT,
    );
    let v1 = rest.merge(events::router());

    Router::new()
        .merge(health::router())
        .route("/metrics", get(metrics_handler))
        .nest("/api/v1", v1)
        .with_state(state)
}

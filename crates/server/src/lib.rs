// crates/server/src/lib.rs
//! Coach backend: exercise catalog, daily plans, and plan event fan-out.

pub mod catalog;
pub mod config;
pub mod connections;
pub mod error;
pub mod notifier;
pub mod routes;
pub mod state;

pub use catalog::Catalog;
pub use config::ServerConfig;
pub use connections::{BroadcastReport, ConnectionId, ConnectionRegistry, EventSink, WsSink};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use notifier::PlanUpdateNotifier;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::http::{header, HeaderName, Method};
use axum::Router;
use coach_types::USER_EMAIL_HEADER;
use tower_http::cors::{Any, CorsLayer};

/// Create the Axum application with all routes and middleware.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_EMAIL_HEADER),
        ]);

    coach_observability::with_http_layers(api_routes(state).layer(cors))
}

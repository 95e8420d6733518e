// crates/wrapper/src/lib.rs
//! Gateway between the browser, the agent runtime and the coach backend.

pub mod agent;
pub mod backend;
pub mod bridge;
pub mod config;
pub mod error;
pub mod proxy;
pub mod routes;
pub mod sessions;
pub mod state;
pub mod tts;
mod upstream;

pub use agent::{AgentClient, DeleteOutcome};
pub use backend::CoachBackendClient;
pub use config::{TtsConfig, WrapperConfig};
pub use error::{ApiError, ApiResult, GatewayError};
pub use proxy::{Leg, LegExit, ProxyOutcome, ProxyState, SessionProxy};
pub use routes::api_routes;
pub use sessions::{SessionDirectory, SessionRuntime, SessionStore};
pub use state::WrapperState;
pub use tts::{GoogleTts, SpeechSynthesizer};

use std::sync::Arc;

use axum::http::{header, HeaderName, Method};
use axum::Router;
use coach_types::USER_EMAIL_HEADER;
use tower_http::cors::{Any, CorsLayer};

/// Session directory backed by the coach backend and the agent runtime.
pub type CoachSessions = SessionDirectory<CoachBackendClient, AgentClient>;

pub fn create_app(state: Arc<WrapperState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static(USER_EMAIL_HEADER),
        ]);

    coach_observability::with_http_layers(api_routes(state).layer(cors))
}

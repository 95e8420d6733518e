// crates/server/src/routes/events.rs
//! Plan event WebSocket. The server pushes `PlanUpdateEvent` frames;
//! client frames only keep the connection alive.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::StreamExt;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub email: Option<String>,
}

/// GET /api/v1/ws?email=<user>
pub async fn events_ws(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let Some(user) = query
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
    else {
        return ApiError::BadRequest("email query parameter is required".to_string())
            .into_response();
    };
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, user)),
        Err(rejection) => rejection.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user: String) {
    let (sink, mut stream) = socket.split();
    let id = state.connections.add(&user, sink);
    info!(user = %user, "event connection opened");

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(user = %user, error = %e, "event connection read failed");
                break;
            }
        }
    }

    state.connections.remove(&user, id);
    info!(user = %user, "event connection closed");
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(events_ws))
}

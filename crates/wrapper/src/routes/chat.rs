// crates/wrapper/src/routes/chat.rs
//! Chat endpoints: one-shot prompt, session cleanup, live stream.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use coach_observability::with_request_timeout;
use coach_types::{InlineData, Part, RunEvent};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::sessions::{PreviousSession, ResetOutcome};
use crate::state::WrapperState;

pub const AUDIO_MIME_TYPE: &str = "audio/mp3";

#[derive(Debug, Serialize)]
pub struct WrapperResponse {
    pub part: Part,
    pub status: String,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("application/json"))
}

/// POST /api/v1/chat - body is one `Part`.
pub async fn prompt(
    State(state): State<Arc<WrapperState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WrapperResponse>> {
    let user = state.identity.resolve(&headers)?;
    if !is_json(&headers) {
        return Err(ApiError::BadRequest(
            "Content-Type must be application/json".to_string(),
        ));
    }
    let part: Part = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "unparseable prompt");
        ApiError::BadRequest("Invalid request payload".to_string())
    })?;

    let resolved = state.sessions.resolve(&user).await?;
    let mut parts = Vec::with_capacity(2);
    if resolved.created {
        // A fresh session needs an opening turn before the real prompt.
        parts.push(Part::text(" "));
    }
    parts.push(part);

    let agent = state.sessions.runtime();
    let request = agent.run_request(&user, &resolved.session_id, parts);
    let events = agent.run(&request).await?;
    let mut reply = Part::text(RunEvent::reply_text(&events));

    if let Some(tts) = state.tts.as_ref().filter(|_| !reply.text.is_empty()) {
        let synthesized = tts.synthesize(&reply.text).await;
        match synthesized {
            Ok(audio) => {
                reply.inline_data = Some(InlineData {
                    mime_type: AUDIO_MIME_TYPE.to_string(),
                    data: STANDARD.encode(audio),
                });
            }
            Err(e) => warn!(user = %user, error = %e, "speech synthesis failed, replying with text only"),
        }
    }

    Ok(Json(WrapperResponse {
        part: reply,
        status: "success".to_string(),
    }))
}

/// DELETE /api/v1/chat - plain-text reply.
pub async fn clean(State(state): State<Arc<WrapperState>>, headers: HeaderMap) -> Response {
    let user = match state.identity.resolve(&headers) {
        Ok(user) => user,
        Err(e) => return (StatusCode::UNAUTHORIZED, e.to_string()).into_response(),
    };

    match state.sessions.reset(&user).await {
        Ok(ResetOutcome {
            previous: PreviousSession::NotFound(stale),
            session_id,
        }) => {
            info!(user = %user, stale = %stale, session_id = %session_id, "previous session was already gone");
            (StatusCode::NOT_FOUND, "Session not found").into_response()
        }
        Ok(_) => (StatusCode::OK, "Session cleaned successfully").into_response(),
        Err(e) => {
            error!(user = %user, error = %e, "session cleanup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// GET /api/v1/chat/stream - identity is checked before the upgrade.
pub async fn stream(
    State(state): State<Arc<WrapperState>>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let user = match state.identity.resolve(&headers) {
        Ok(user) => user,
        Err(e) => return ApiError::from(e).into_response(),
    };
    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| async move {
            let outcome = state.proxy.run(socket, &user).await;
            info!(user = %user, outcome = ?outcome, "stream session ended");
        }),
        Err(rejection) => rejection.into_response(),
    }
}

/// `/chat` is bounded by `rest_timeout`; the stream upgrade is not.
pub fn router(rest_timeout: Duration) -> Router<Arc<WrapperState>> {
    let rest = with_request_timeout(
        Router::new().route("/chat", post(prompt).delete(clean)),
        rest_timeout,
    );
    rest.route("/chat/stream", get(stream))
}

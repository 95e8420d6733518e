//! Router-level tests for the one-shot chat endpoints against mocked upstreams.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use coach_types::UserResolver;
use coach_wrapper::{
    create_app, AgentClient, CoachBackendClient, GoogleTts, SessionDirectory, SessionProxy,
    SpeechSynthesizer, TtsConfig, WrapperState,
};
use mockito::{Matcher, Mock, ServerGuard};
use pretty_assertions::assert_eq;
use reqwest::Url;
use serde_json::{json, Value};
use tower::ServiceExt;

const USER: &str = "anna@example.com";
const TODAY: &str = "/api/v1/daily-plans/today";
const CREATE: &str = "/apps/coach/users/anna@example.com/agentEngineSessions";

struct Upstreams {
    backend: ServerGuard,
    agent: ServerGuard,
    tts: ServerGuard,
}

impl Upstreams {
    async fn start() -> Self {
        Self {
            backend: mockito::Server::new_async().await,
            agent: mockito::Server::new_async().await,
            tts: mockito::Server::new_async().await,
        }
    }

    fn app(&self, identity: UserResolver, with_tts: bool) -> Router {
        let backend = CoachBackendClient::new(Url::parse(&self.backend.url()).unwrap()).unwrap();
        let agent = AgentClient::new(Url::parse(&self.agent.url()).unwrap(), "coach").unwrap();
        let sessions = Arc::new(SessionDirectory::new(backend, agent, None));
        let proxy = SessionProxy::new(sessions.clone(), None);
        let tts = with_tts.then(|| {
            let endpoint = Url::parse(&format!("{}/v1/text:synthesize", self.tts.url())).unwrap();
            let config = TtsConfig {
                api_key: "key".into(),
                language_code: "fr-FR".into(),
                voice_name: "fr-FR-Chirp3-HD-Sulafat".into(),
                speaking_rate: 1.0,
            };
            Arc::new(GoogleTts::with_endpoint(config, endpoint).unwrap()) as Arc<dyn SpeechSynthesizer>
        });
        create_app(WrapperState::new(identity, sessions, proxy, tts))
    }

    async fn plan_with_session(&mut self, session_id: Option<&str>, hits: usize) -> Mock {
        let mut plan = json!({"id": "anna@example.com-2025-06-01", "date": "2025-06-01"});
        if let Some(id) = session_id {
            plan["sessionId"] = json!(id);
        }
        self.backend
            .mock("GET", TODAY)
            .match_query(Matcher::UrlEncoded("source".into(), "agent".into()))
            .match_header("x-user-email", USER)
            .with_body(plan.to_string())
            .expect(hits)
            .create_async()
            .await
    }

    async fn run_replies(&mut self, texts: &[&str]) -> Mock {
        let events: Vec<Value> = texts
            .iter()
            .map(|t| json!({"author": "coach", "content": {"role": "model", "parts": [{"text": t}]}}))
            .collect();
        self.agent
            .mock("POST", "/run")
            .with_body(Value::from(events).to_string())
            .create_async()
            .await
    }
}

async fn send(app: Router, method: &str, body: Option<&str>, content_type: &str) -> (StatusCode, String) {
    let mut builder = Request::builder()
        .method(method)
        .uri("/api/v1/chat")
        .header("x-user-email", USER);
    if !content_type.is_empty() {
        builder = builder.header("content-type", content_type);
    }
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn prompt(app: Router, body: &str) -> (StatusCode, String) {
    send(app, "POST", Some(body), "application/json").await
}

#[tokio::test]
async fn first_prompt_creates_session_and_speaks() {
    let mut up = Upstreams::start().await;
    let today = up.plan_with_session(None, 2).await;
    let create = up
        .agent
        .mock("POST", CREATE)
        .match_body(Matcher::Json(json!({"user:first_name": "Anna"})))
        .with_body(r#"{"id":"sess-1"}"#)
        .create_async()
        .await;
    let store = up
        .backend
        .mock("PUT", TODAY)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({"sessionId": "sess-1"})))
        .create_async()
        .await;
    let run = up
        .agent
        .mock("POST", "/run")
        .match_body(Matcher::PartialJson(json!({
            "appName": "coach",
            "userId": USER,
            "sessionId": "sess-1",
            "newMessage": {"role": "user", "parts": [{"text": " "}, {"text": "salut"}]}
        })))
        .with_body(
            json!([
                {"content": {"parts": [{"text": "Bonjour"}]}},
                {"content": {"parts": [{"text": " Anna"}]}}
            ])
            .to_string(),
        )
        .create_async()
        .await;
    let tts = up
        .tts
        .mock("POST", "/v1/text:synthesize")
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({"input": {"text": "Bonjour Anna"}})))
        .with_body(json!({"audioContent": STANDARD.encode(b"mp3")}).to_string())
        .create_async()
        .await;

    let (status, body) = prompt(up.app(UserResolver::Header, true), r#"{"text":"salut"}"#).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let reply: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reply["status"], "success");
    assert_eq!(reply["part"]["text"], "Bonjour Anna");
    assert_eq!(reply["part"]["inlineData"]["mimeType"], "audio/mp3");
    assert_eq!(reply["part"]["inlineData"]["data"], STANDARD.encode(b"mp3"));

    for mock in [today, create, store, run, tts] {
        mock.assert_async().await;
    }
}

#[tokio::test]
async fn existing_session_is_reused_without_opening_turn() {
    let mut up = Upstreams::start().await;
    let _m1 = up.plan_with_session(Some("sess-7"), 1).await;
    let run = up
        .agent
        .mock("POST", "/run")
        .match_body(Matcher::PartialJson(json!({
            "sessionId": "sess-7",
            "newMessage": {"parts": [{"text": "encore"}]}
        })))
        .with_body(r#"[{"content":{"parts":[{"text":"Oui"}]}}]"#)
        .create_async()
        .await;

    let (status, body) = prompt(up.app(UserResolver::Header, false), r#"{"text":"encore"}"#).await;
    assert_eq!(status, StatusCode::OK);
    let reply: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reply["part"], json!({"text": "Oui"}));
    run.assert_async().await;
}

#[tokio::test]
async fn synthesis_failure_still_returns_text() {
    let mut up = Upstreams::start().await;
    let _m2 = up.plan_with_session(Some("sess-7"), 1).await;
    let _m3 = up.run_replies(&["Oui"]).await;
    let _m4 = up.tts
        .mock("POST", "/v1/text:synthesize")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;

    let (status, body) = prompt(up.app(UserResolver::Header, true), r#"{"text":"?"}"#).await;
    assert_eq!(status, StatusCode::OK);
    let reply: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reply["part"]["text"], "Oui");
    assert!(reply["part"].get("inlineData").is_none());
}

#[tokio::test]
async fn empty_reply_is_not_synthesized() {
    let mut up = Upstreams::start().await;
    let _m5 = up.plan_with_session(Some("sess-7"), 1).await;
    let _m6 = up.agent
        .mock("POST", "/run")
        .with_body("[]")
        .create_async()
        .await;
    let tts = up
        .tts
        .mock("POST", "/v1/text:synthesize")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (status, _) = prompt(up.app(UserResolver::Header, true), r#"{"text":"?"}"#).await;
    assert_eq!(status, StatusCode::OK);
    tts.assert_async().await;
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let up = Upstreams::start().await;
    let app = up.app(UserResolver::Header, false);

    let (status, _) = send(app.clone(), "POST", Some(r#"{"text":"x"}"#), "text/plain").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = prompt(app, "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(error["error"], "Invalid request payload");
}

#[tokio::test]
async fn agent_failure_is_a_bad_gateway() {
    let mut up = Upstreams::start().await;
    let _m7 = up.plan_with_session(Some("sess-7"), 1).await;
    let _m8 = up.agent
        .mock("POST", "/run")
        .with_status(500)
        .with_body("model crashed")
        .create_async()
        .await;

    let (status, body) = prompt(up.app(UserResolver::Header, false), r#"{"text":"?"}"#).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let error: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(error["details"], "agent runtime returned 500: model crashed");
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let up = Upstreams::start().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/chat")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"text":"x"}"#))
        .unwrap();
    let response = up
        .app(UserResolver::Header, false)
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = up
        .app(UserResolver::Header, false)
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/chat")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn clean_replaces_the_session() {
    let mut up = Upstreams::start().await;
    let _m9 = up.plan_with_session(Some("sess-old"), 2).await;
    let delete = up
        .agent
        .mock("DELETE", "/apps/coach/users/anna@example.com/sessions/sess-old")
        .create_async()
        .await;
    let _m10 = up.agent
        .mock("POST", CREATE)
        .with_body(r#"{"id":"sess-new"}"#)
        .create_async()
        .await;
    let store = up
        .backend
        .mock("PUT", TODAY)
        .match_query(Matcher::Any)
        .match_body(Matcher::PartialJson(json!({"sessionId": "sess-new"})))
        .create_async()
        .await;

    let (status, body) = send(up.app(UserResolver::Header, false), "DELETE", None, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Session cleaned successfully");
    delete.assert_async().await;
    store.assert_async().await;
}

#[tokio::test]
async fn clean_reports_unknown_session() {
    let mut up = Upstreams::start().await;
    let _m11 = up.plan_with_session(Some("sess-stale"), 2).await;
    let _m12 = up.agent
        .mock("DELETE", "/apps/coach/users/anna@example.com/sessions/sess-stale")
        .with_status(404)
        .create_async()
        .await;
    let _m13 = up.agent
        .mock("POST", CREATE)
        .with_body(r#"{"id":"sess-new"}"#)
        .create_async()
        .await;
    let _m14 = up.backend
        .mock("PUT", TODAY)
        .match_query(Matcher::Any)
        .create_async()
        .await;

    let (status, body) = send(up.app(UserResolver::Fixed(USER.into()), false), "DELETE", None, "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, "Session not found");
}

#[tokio::test]
async fn clean_failure_is_a_server_error() {
    let mut up = Upstreams::start().await;
    let _m15 = up.plan_with_session(None, 1).await;
    let _m16 = up.agent
        .mock("POST", CREATE)
        .with_status(503)
        .create_async()
        .await;

    let (status, body) = send(up.app(UserResolver::Header, false), "DELETE", None, "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("503"), "{body}");
}

#[tokio::test]
async fn health_and_metrics_are_mounted() {
    let up = Upstreams::start().await;
    let response = up
        .app(UserResolver::Header, false)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
}

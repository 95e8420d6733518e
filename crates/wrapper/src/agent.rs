//! Client of the agent runtime: session CRUD, `/run` and the `/run_live` URL.

use async_trait::async_trait;
use coach_types::{AgentSession, Content, Part, RunEvent, RunRequest};
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::error::{GatewayError, AGENT};
use crate::sessions::SessionRuntime;
use crate::upstream::{connect, http_client, join_segments, websocket_url, UpstreamSocket};

/// Result of deleting a session that may already be gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

#[derive(Debug, Clone)]
pub struct AgentClient {
    http: reqwest::Client,
    base_url: Url,
    app_name: String,
}

impl AgentClient {
    pub fn new(base_url: Url, app_name: impl Into<String>) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http_client()?,
            base_url,
            app_name: app_name.into(),
        })
    }

    /// Create an agent-engine session seeded with `state`; returns its id.
    pub async fn create_session(
        &self,
        user: &str,
        state: &serde_json::Value,
    ) -> Result<String, GatewayError> {
        let url = join_segments(
            &self.base_url,
            &["apps", &self.app_name, "users", user, "agentEngineSessions"],
        )?;
        let response = self
            .http
            .post(url)
            .json(state)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(AGENT, e))?;
        if !response.status().is_success() {
            return Err(GatewayError::rejected(AGENT, response).await);
        }
        let session: AgentSession = response
            .json()
            .await
            .map_err(|e| GatewayError::from_reqwest(AGENT, e))?;
        if session.id.is_empty() {
            return Err(GatewayError::protocol(AGENT, "session created without an id"));
        }
        debug!(user, session_id = %session.id, "agent session created");
        Ok(session.id)
    }

    pub async fn delete_session(
        &self,
        user: &str,
        session_id: &str,
    ) -> Result<DeleteOutcome, GatewayError> {
        let url = join_segments(
            &self.base_url,
            &["apps", &self.app_name, "users", user, "sessions", session_id],
        )?;
        let response = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(AGENT, e))?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            status if status.is_success() => Ok(DeleteOutcome::Deleted),
            _ => Err(GatewayError::rejected(AGENT, response).await),
        }
    }

    pub fn run_request(&self, user: &str, session_id: &str, parts: Vec<Part>) -> RunRequest {
        RunRequest {
            app_name: self.app_name.clone(),
            user_id: user.to_string(),
            session_id: session_id.to_string(),
            new_message: Content {
                role: "user".to_string(),
                parts,
            },
        }
    }

    /// One non-streaming turn. The runtime answers with an array of events.
    pub async fn run(&self, request: &RunRequest) -> Result<Vec<RunEvent>, GatewayError> {
        let url = join_segments(&self.base_url, &["run"])?;
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(AGENT, e))?;
        if !response.status().is_success() {
            return Err(GatewayError::rejected(AGENT, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::from_reqwest(AGENT, e))
    }

    /// Live audio endpoint of `session_id`.
    pub fn live_url(&self, user: &str, session_id: &str) -> Result<Url, GatewayError> {
        let mut url = websocket_url(join_segments(&self.base_url, &["run_live"])?)?;
        url.query_pairs_mut()
            .append_pair("app_name", &self.app_name)
            .append_pair("user_id", user)
            .append_pair("session_id", session_id)
            .append_pair("modalities", "AUDIO");
        Ok(url)
    }

    pub async fn connect_live(
        &self,
        user: &str,
        session_id: &str,
    ) -> Result<UpstreamSocket, GatewayError> {
        connect(AGENT, &self.live_url(user, session_id)?).await
    }
}

#[async_trait]
impl SessionRuntime for AgentClient {
    async fn create_session(
        &self,
        user: &str,
        state: &serde_json::Value,
    ) -> Result<String, GatewayError> {
        AgentClient::create_session(self, user, state).await
    }

    async fn delete_session(
        &self,
        user: &str,
        session_id: &str,
    ) -> Result<DeleteOutcome, GatewayError> {
        AgentClient::delete_session(self, user, session_id).await
    }
}

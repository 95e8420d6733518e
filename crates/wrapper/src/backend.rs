//! Client of the coach backend: today's plan and its event socket.

use async_trait::async_trait;
use coach_types::{DailyTrainingPlan, USER_EMAIL_HEADER};
use reqwest::Url;
use serde::Serialize;
use tracing::debug;

use crate::error::{GatewayError, BACKEND};
use crate::sessions::SessionStore;
use crate::upstream::{connect, http_client, join_segments, websocket_url, UpstreamSocket};

/// Body of the session-id write: only the fields the backend needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionIdUpdate<'a> {
    id: &'a str,
    session_id: &'a str,
    date: &'a str,
}

#[derive(Debug, Clone)]
pub struct CoachBackendClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CoachBackendClient {
    pub fn new(base_url: Url) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http_client()?,
            base_url,
        })
    }

    fn today_url(&self) -> Result<Url, GatewayError> {
        let mut url = join_segments(&self.base_url, &["api", "v1", "daily-plans", "today"])?;
        url.query_pairs_mut().append_pair("source", "agent");
        Ok(url)
    }

    /// Today's plan for `user`; the backend creates it on first read.
    pub async fn today_plan(&self, user: &str) -> Result<DailyTrainingPlan, GatewayError> {
        let response = self
            .http
            .get(self.today_url()?)
            .header(USER_EMAIL_HEADER, user)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(BACKEND, e))?;
        if !response.status().is_success() {
            return Err(GatewayError::rejected(BACKEND, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::from_reqwest(BACKEND, e))
    }

    /// Record `session_id` on today's plan.
    pub async fn update_session_id(&self, user: &str, session_id: &str) -> Result<(), GatewayError> {
        let plan = self.today_plan(user).await?;
        let body = SessionIdUpdate {
            id: &plan.id,
            session_id,
            date: &plan.date,
        };
        let response = self
            .http
            .put(self.today_url()?)
            .header(USER_EMAIL_HEADER, user)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest(BACKEND, e))?;
        if !response.status().is_success() {
            return Err(GatewayError::rejected(BACKEND, response).await);
        }
        debug!(user, session_id, "session id stored on today's plan");
        Ok(())
    }

    pub fn events_url(&self, user: &str) -> Result<Url, GatewayError> {
        let mut url = websocket_url(join_segments(&self.base_url, &["api", "v1", "ws"])?)?;
        url.query_pairs_mut().append_pair("email", user);
        Ok(url)
    }

    /// Plan-update event socket of `user`.
    pub async fn connect_events(&self, user: &str) -> Result<UpstreamSocket, GatewayError> {
        connect(BACKEND, &self.events_url(user)?).await
    }
}

#[async_trait]
impl SessionStore for CoachBackendClient {
    async fn stored_session_id(&self, user: &str) -> Result<Option<String>, GatewayError> {
        let plan = self.today_plan(user).await?;
        Ok(plan.session_id.filter(|id| !id.is_empty()))
    }

    async fn store_session_id(&self, user: &str, session_id: &str) -> Result<(), GatewayError> {
        self.update_session_id(user, session_id).await
    }
}

//! Wire types of the agent runtime (session CRUD, `/run`, `/run_live`).

use serde::{Deserialize, Serialize};

use crate::event::EventSource;

/// Session object returned by the runtime's session endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSession {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    /// Base64 payload.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
}

/// One piece of a message: text, inline media, or a tool response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_response: Option<serde_json::Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

/// Body of `POST /run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub new_message: Content,
}

/// One event of the `/run` response array. Fields we do not use are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RunEvent {
    pub id: String,
    pub invocation_id: String,
    pub author: String,
    pub content: Content,
}

impl RunEvent {
    /// Concatenated text of the first part of every event.
    pub fn reply_text(events: &[RunEvent]) -> String {
        events
            .iter()
            .filter_map(|event| event.content.parts.first())
            .map(|part| part.text.as_str())
            .collect()
    }
}

/// Message injected into a live agent session when the plan changes
/// outside the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub mime_type: String,
    pub event_source: EventSource,
    pub event_type: String,
    pub data: serde_json::Value,
}

impl AgentEvent {
    pub const MIME_TYPE: &'static str = "application/json";
    pub const PLAN_UPDATED: &'static str = "plan_updated";

    pub fn plan_updated(source: EventSource, data: serde_json::Value) -> Self {
        Self {
            mime_type: Self::MIME_TYPE.to_string(),
            event_source: source,
            event_type: Self::PLAN_UPDATED.to_string(),
            data,
        }
    }
}

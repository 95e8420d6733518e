//! The `{action, data, source}` envelope pushed to event connections.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What happened. Unknown tags from peers deserialize to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventAction {
    #[serde(rename = "PLAN_UPDATED")]
    PlanUpdated,
    #[serde(other, skip_serializing)]
    Other,
}

/// Origin of a change, trimmed and lower-cased. Defaults to `api`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct EventSource(String);

impl EventSource {
    pub const API: &'static str = "api";
    pub const AGENT: &'static str = "agent";

    pub fn new(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            Self(Self::API.to_string())
        } else {
            Self(normalized)
        }
    }

    pub fn api() -> Self {
        Self(Self::API.to_string())
    }

    pub fn agent() -> Self {
        Self(Self::AGENT.to_string())
    }

    /// Changes made by the agent itself must not be echoed back to it.
    pub fn is_agent(&self) -> bool {
        self.0 == Self::AGENT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EventSource {
    fn default() -> Self {
        Self::api()
    }
}

impl From<String> for EventSource {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<EventSource> for String {
    fn from(source: EventSource) -> Self {
        source.0
    }
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanUpdateEvent<T = serde_json::Value> {
    pub action: EventAction,
    pub data: T,
    #[serde(default)]
    pub source: EventSource,
}

impl<T> PlanUpdateEvent<T> {
    pub fn plan_updated(data: T, source: EventSource) -> Self {
        Self {
            action: EventAction::PlanUpdated,
            data,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn source_is_case_normalized() {
        assert_eq!(EventSource::new("  Agent ").as_str(), "agent");
        assert!(EventSource::new("AGENT").is_agent());
        assert_eq!(EventSource::new("API").as_str(), "api");
        assert_eq!(EventSource::new("").as_str(), "api");
    }

    #[test]
    fn envelope_wire_shape() {
        let event = PlanUpdateEvent::plan_updated(json!({"id": "p"}), EventSource::agent());
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({"action": "PLAN_UPDATED", "data": {"id": "p"}, "source": "agent"})
        );
    }

    #[test]
    fn unknown_action_and_missing_source_still_parse() {
        let event: PlanUpdateEvent =
            serde_json::from_str(r#"{"action":"DRILL_ADDED","data":null}"#).unwrap();
        assert_eq!(event.action, EventAction::Other);
        assert_eq!(event.source, EventSource::api());
    }

    #[test]
    fn incoming_source_is_normalized() {
        let event: PlanUpdateEvent =
            serde_json::from_str(r#"{"action":"PLAN_UPDATED","data":{},"source":"Agent"}"#)
                .unwrap();
        assert!(event.source.is_agent());
    }
}

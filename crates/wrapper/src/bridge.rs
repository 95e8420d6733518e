//! Backend event stream → agent live session.
//!
//! Plan updates not made by the agent itself are injected into the agent's
//! session so it can react to edits done elsewhere. The bridge never closes
//! the agent connection; the proxy owns it.

use std::fmt::Display;
use std::sync::Arc;

use coach_observability::metrics::record_bridge_event;
use coach_types::{AgentEvent, EventAction, PlanUpdateEvent};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeDecision {
    Forward(AgentEvent),
    /// Made by the agent; forwarding it would echo.
    Suppressed,
    /// Not an action the agent cares about.
    Ignored,
    Malformed(String),
}

pub fn translate(text: &str) -> BridgeDecision {
    let event: PlanUpdateEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => return BridgeDecision::Malformed(e.to_string()),
    };
    if event.action != EventAction::PlanUpdated {
        return BridgeDecision::Ignored;
    }
    if event.source.is_agent() {
        return BridgeDecision::Suppressed;
    }
    BridgeDecision::Forward(AgentEvent::plan_updated(event.source, event.data))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeExit {
    UpstreamClosed,
    UpstreamError,
    AgentWriteFailed,
    Cancelled,
}

pub async fn run_bridge<E, EErr, A>(
    mut events: E,
    agent: Arc<Mutex<A>>,
    cancel: CancellationToken,
) -> BridgeExit
where
    E: Stream<Item = Result<Message, EErr>> + Unpin,
    EErr: Display,
    A: Sink<Message> + Unpin,
    A::Error: Display,
{
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return BridgeExit::Cancelled,
            next = events.next() => next,
        };

        let text = match next {
            None | Some(Ok(Message::Close(_))) => {
                debug!("backend event stream closed");
                return BridgeExit::UpstreamClosed;
            }
            Some(Err(e)) => {
                warn!(error = %e, "backend event stream read failed");
                return BridgeExit::UpstreamError;
            }
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(_)) => continue,
        };

        match translate(&text) {
            BridgeDecision::Forward(event) => {
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "failed to encode agent event");
                        record_bridge_event("malformed");
                        continue;
                    }
                };
                let sent = agent.lock().await.send(Message::Text(payload.into())).await;
                if let Err(e) = sent {
                    warn!(error = %e, "failed to forward plan update to agent");
                    return BridgeExit::AgentWriteFailed;
                }
                debug!(source = %event.event_source, "plan update forwarded to agent");
                record_bridge_event("forwarded");
            }
            BridgeDecision::Suppressed => {
                debug!("agent-sourced plan update not echoed");
                record_bridge_event("suppressed");
            }
            BridgeDecision::Ignored => record_bridge_event("ignored"),
            BridgeDecision::Malformed(reason) => {
                warn!(error = %reason, "skipping malformed backend event");
                record_bridge_event("malformed");
            }
        }
    }
}

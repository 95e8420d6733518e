// crates/server/src/notifier.rs
use std::sync::Arc;

use coach_types::{DailyTrainingPlan, EventSource, PlanUpdateEvent};

use crate::connections::{BroadcastReport, ConnectionRegistry, EventSink};

/// Pushes the persisted plan to the user's event connections.
pub struct PlanUpdateNotifier<S> {
    connections: Arc<ConnectionRegistry<S>>,
}

impl<S> Clone for PlanUpdateNotifier<S> {
    fn clone(&self) -> Self {
        Self {
            connections: self.connections.clone(),
        }
    }
}

impl<S: EventSink> PlanUpdateNotifier<S> {
    pub fn new(connections: Arc<ConnectionRegistry<S>>) -> Self {
        Self { connections }
    }

    /// `plan` must be the record re-read from storage, not the request body.
    pub async fn notify(
        &self,
        user: &str,
        plan: &DailyTrainingPlan,
        source: EventSource,
    ) -> BroadcastReport {
        let event = PlanUpdateEvent::plan_updated(plan, source);
        self.connections.broadcast(user, &event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::mpsc;

    struct ChannelSink(mpsc::UnboundedSender<String>);

    #[async_trait]
    impl EventSink for ChannelSink {
        async fn send_text(&mut self, text: &str) -> Result<(), axum::Error> {
            self.0.send(text.to_string()).map_err(axum::Error::new)
        }

        async fn close(&mut self) {}
    }

    #[tokio::test]
    async fn notify_sends_plan_updated_envelope() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.add("a@x.com", ChannelSink(tx));
        let notifier = PlanUpdateNotifier::new(registry);

        let plan = DailyTrainingPlan {
            id: "a@x.com-2025-06-01".into(),
            date: "2025-06-01".into(),
            ..DailyTrainingPlan::default()
        };
        let report = notifier.notify("a@x.com", &plan, EventSource::agent()).await;
        assert_eq!(report.delivered, 1);

        let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(
            frame,
            json!({
                "action": "PLAN_UPDATED",
                "data": {"id": "a@x.com-2025-06-01", "date": "2025-06-01"},
                "source": "agent"
            })
        );
    }
}

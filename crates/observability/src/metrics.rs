//! Prometheus metrics for both services.
//!
//! `init_metrics` installs the global recorder once; `GET /metrics` is served
//! by [`metrics_handler`].

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub const BROADCASTS_TOTAL: &str = "coach_broadcasts_total";
pub const PLAN_UPDATES_TOTAL: &str = "coach_plan_updates_total";
pub const STREAM_SESSIONS_TOTAL: &str = "wrapper_stream_sessions_total";
pub const BRIDGE_EVENTS_TOTAL: &str = "wrapper_bridge_events_total";

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder.
///
/// Returns `true` if this call installed it, `false` if already installed.
pub fn init_metrics() -> bool {
    if PROMETHEUS_HANDLE.get().is_some() {
        return false;
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    if metrics::set_global_recorder(recorder).is_err() {
        tracing::warn!("Failed to set global metrics recorder (already set)");
        return false;
    }
    if PROMETHEUS_HANDLE.set(handle).is_err() {
        tracing::warn!("Failed to store Prometheus handle (already set)");
    }

    describe_metrics();
    tracing::info!("Prometheus metrics initialized");
    true
}

fn describe_metrics() {
    describe_counter!(
        BROADCASTS_TOTAL,
        "Plan update deliveries to event connections, by outcome"
    );
    describe_counter!(PLAN_UPDATES_TOTAL, "Persisted plan updates, by source");
    describe_counter!(
        STREAM_SESSIONS_TOTAL,
        "Streaming chat sessions, by how they ended"
    );
    describe_counter!(
        BRIDGE_EVENTS_TOTAL,
        "Backend events seen by the event bridge, by outcome"
    );
}

/// Current metrics in Prometheus text format, `None` before [`init_metrics`].
pub fn render_metrics() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|h| h.render())
}

/// `outcome` is `delivered`, `pruned` or `dropped`.
pub fn record_broadcast(outcome: &'static str, count: u64) {
    if count > 0 {
        counter!(BROADCASTS_TOTAL, "outcome" => outcome).increment(count);
    }
}

/// Sources are caller-supplied, so only `api` and `agent` keep their own
/// series; everything else is counted under `other`.
pub fn record_plan_update(source: &str) {
    counter!(PLAN_UPDATES_TOTAL, "source" => source_label(source)).increment(1);
}

fn source_label(source: &str) -> &'static str {
    match source.trim().to_ascii_lowercase().as_str() {
        "api" | "" => "api",
        "agent" => "agent",
        _ => "other",
    }
}

pub fn record_stream_session(outcome: &'static str) {
    counter!(STREAM_SESSIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// `outcome` is `forwarded`, `suppressed`, `ignored` or `malformed`.
pub fn record_bridge_event(outcome: &'static str) {
    counter!(BRIDGE_EVENTS_TOTAL, "outcome" => outcome).increment(1);
}

/// GET /metrics. 503 until the recorder is installed.
pub async fn metrics_handler() -> Response {
    match render_metrics() {
        Some(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            output,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "Metrics not initialized").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_labels_are_bucketed() {
        assert_eq!(source_label("api"), "api");
        assert_eq!(source_label(" Agent "), "agent");
        assert_eq!(source_label(""), "api");
        assert_eq!(source_label("attacker1"), "other");
        assert_eq!(source_label("ui"), "other");
    }
}

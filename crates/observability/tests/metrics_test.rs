//! Each test file runs in its own process, so the global recorder starts
//! uninstalled here.

use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
use coach_observability::metrics::{
    init_metrics, metrics_handler, record_bridge_event, record_plan_update, render_metrics,
};
use tower::ServiceExt;

fn app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn get_metrics() -> (StatusCode, String) {
    let response = app()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_metrics_lifecycle() {
    assert!(render_metrics().is_none());
    let (status, _) = get_metrics().await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    assert!(init_metrics());
    assert!(!init_metrics(), "second init is a no-op");

    record_plan_update("agent");
    for i in 0..20 {
        record_plan_update(&format!("attacker{i}"));
    }
    record_bridge_event("suppressed");

    let (status, body) = get_metrics().await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("coach_plan_updates_total{source=\"agent\"} 1"), "{body}");
    assert!(body.contains("coach_plan_updates_total{source=\"other\"} 20"), "{body}");
    assert!(!body.contains("attacker"), "{body}");
    assert!(body.contains("wrapper_bridge_events_total{outcome=\"suppressed\"} 1"), "{body}");
}

// crates/server/src/routes/plans.rs
//! Daily plan endpoints.
//!
//! Plans are keyed by the resolved user and the UTC day. Only today's plan
//! can be initiated or updated; past days are read-only.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use coach_observability::metrics::record_plan_update;
use coach_types::{plan_doc_id, DailyTrainingPlan, EventSource, DATE_FORMAT};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SourceQuery {
    pub source: Option<String>,
}

impl SourceQuery {
    pub fn source(&self) -> EventSource {
        EventSource::new(self.source.as_deref().unwrap_or_default())
    }
}

fn parse_date(raw: &str, today: NaiveDate) -> ApiResult<NaiveDate> {
    if raw == "today" {
        return Ok(today);
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
        ApiError::BadRequest(format!(
            "invalid date format: {raw}, use YYYY-MM-DD or 'today'"
        ))
    })
}

/// POST /api/v1/daily-plans/initiate - (re)create today's plan from the
/// default template.
pub async fn initiate_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<DailyTrainingPlan>)> {
    let user = state.identity.resolve(&headers)?;
    let now = Utc::now();
    let plan = state.catalog.new_plan(&user, now.date_naive(), now);
    state.db.put_plan(&user, &plan).await?;
    tracing::info!(user = %user, plan_id = %plan.id, "daily plan initiated");
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /api/v1/daily-plans/{date} - `YYYY-MM-DD` or `today`.
///
/// A missing plan for today is created on the fly.
pub async fn get_plan(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<DailyTrainingPlan>> {
    let now = Utc::now();
    let today = now.date_naive();
    let date = parse_date(&date, today)?;
    let user = state.identity.resolve(&headers)?;
    let id = plan_doc_id(&user, date);

    if let Some(plan) = state.db.get_plan(&id).await? {
        return Ok(Json(plan));
    }
    if date != today {
        return Err(ApiError::NotFound(format!(
            "Daily plan for {id} not found. Initiate it first."
        )));
    }

    tracing::info!(user = %user, plan_id = %id, "auto-initiating today's plan");
    let fresh = state.catalog.new_plan(&user, today, now);
    let plan = state.db.insert_plan_if_absent(&user, &fresh).await?;
    Ok(Json(plan))
}

/// GET /api/v1/daily-plans/today
pub async fn get_today(
    state: State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Json<DailyTrainingPlan>> {
    get_plan(state, Path("today".to_string()), headers).await
}

/// PUT /api/v1/daily-plans/today?source=<tag> - merge a partial plan.
///
/// The stored record is re-read after the write and broadcast to the
/// user's event connections.
pub async fn update_today(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SourceQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<DailyTrainingPlan>> {
    let source = query.source();
    let update: DailyTrainingPlan = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid request payload".to_string()))?;

    let now = Utc::now();
    let today = now.date_naive().format(DATE_FORMAT).to_string();
    if !update.date.is_empty() && update.date != today {
        return Err(ApiError::BadRequest(
            "Can only update today's plan via this endpoint. Date in payload mismatches today."
                .to_string(),
        ));
    }

    let user = state.identity.resolve(&headers)?;
    let id = plan_doc_id(&user, now.date_naive());

    if !state.db.update_plan(&id, &update, now).await? {
        return Err(ApiError::NotFound(format!(
            "Daily plan for {id} not found. Initiate it first."
        )));
    }
    record_plan_update(source.as_str());

    let plan = state
        .db
        .get_plan(&id)
        .await?
        .ok_or_else(|| ApiError::Internal(format!("plan {id} vanished after update")))?;

    if !plan.id.is_empty() {
        let report = state.notifier.notify(&user, &plan, source.clone()).await;
        tracing::debug!(
            user = %user,
            source = %source,
            delivered = report.delivered,
            pruned = report.pruned,
            "plan update broadcast"
        );
    }
    Ok(Json(plan))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/daily-plans/initiate", post(initiate_plan))
        .route("/daily-plans/today", get(get_today).put(update_today))
        .route("/daily-plans/{date}", get(get_plan))
}

// crates/server/src/routes/catalog.rs
//! Read-only catalog endpoints: categories, drills, plan templates.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use coach_types::{Category, Drill, PlanTemplate};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/v1/categories - every category, without drills.
pub async fn list_categories(State(state): State<Arc<AppState>>) -> Json<Vec<Category>> {
    Json(state.catalog.categories())
}

/// GET /api/v1/categories/{category_id}
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(category_id): Path<String>,
) -> ApiResult<Json<Category>> {
    state
        .catalog
        .category(&category_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))
}

/// GET /api/v1/drills
pub async fn list_drills(State(state): State<Arc<AppState>>) -> Json<Vec<Drill>> {
    Json(state.catalog.drills().cloned().collect())
}

/// GET /api/v1/drills/{drill_id}
pub async fn get_drill(
    State(state): State<Arc<AppState>>,
    Path(drill_id): Path<String>,
) -> ApiResult<Json<Drill>> {
    state
        .catalog
        .drill(&drill_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Drill not found".to_string()))
}

/// GET /api/v1/plan-templates
pub async fn list_templates(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(
        state
            .catalog
            .template_ids()
            .into_iter()
            .map(String::from)
            .collect(),
    )
}

/// GET /api/v1/plan-templates/{template_id}
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(template_id): Path<String>,
) -> ApiResult<Json<PlanTemplate>> {
    state
        .catalog
        .template(&template_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound("Only 'default' template ID is supported currently.".to_string())
        })
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/{category_id}", get(get_category))
        .route("/drills", get(list_drills))
        .route("/drills/{drill_id}", get(get_drill))
        .route("/plan-templates", get(list_templates))
        .route("/plan-templates/{template_id}", get(get_template))
}

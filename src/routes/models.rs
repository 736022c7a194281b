use axum::extract::{Path, State};
use axum::Json;

use crate::app_state::AppState;
use crate::models::catalog::{ModelSummary, VideoModel};
use crate::routes::ApiError;

/// GET /api/v1/models
pub async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelSummary>> {
    Json(state.catalog.models().to_vec())
}

/// GET /api/v1/models/:slug: model detail with its parameter schema.
pub async fn get_model(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<VideoModel>, ApiError> {
    Ok(Json(state.catalog.model(&slug)?.clone()))
}

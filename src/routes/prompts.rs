use axum::extract::{Query, State};
use axum::Json;

use crate::app_state::AppState;
use crate::models::catalog::PromptEntry;
use crate::services::catalog::PromptQuery;

/// GET /api/v1/prompts?q=&model=&category=&tag=&limit=
pub async fn search_prompts(
    State(state): State<AppState>,
    Query(query): Query<PromptQuery>,
) -> Json<Vec<PromptEntry>> {
    let results: Vec<PromptEntry> = state.catalog.search(&query).into_iter().cloned().collect();
    tracing::debug!(query = ?query, results = results.len(), "Prompt search");
    Json(results)
}

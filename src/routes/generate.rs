use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{GenerateRequestBody, GenerateResponse};
use crate::routes::ApiError;
use crate::services::collector::ParameterForm;
use crate::services::jobs::JobView;

/// Raw text the way a form control would hand it to the collector.
fn raw_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// POST /api/v1/models/:slug/generate: submit a generation job.
///
/// The job keeps running in the background; poll `GET /api/v1/jobs/:id`.
/// A previous job still active for the same model is abandoned.
pub async fn start_generation(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<GenerateRequestBody>,
) -> Result<(StatusCode, Json<GenerateResponse>), ApiError> {
    body.validate()?;
    let model = state.catalog.model(&slug)?;

    if body.image_url.is_some() && !model.api_config.supports_image {
        return Err(ApiError::BadRequest(format!(
            "{} does not accept a reference image",
            model.name
        )));
    }

    let mut form = ParameterForm::from_model(model);
    for (name, value) in &body.parameters {
        form.set(name, &raw_value(value))?;
    }
    let request = form.build(&body.prompt, body.image_url.clone());

    let handle = state.jobs.start(&slug, &model.api_config.endpoint, request)?;
    tracing::info!(job_id = %handle.id, model = %slug, "Generation job started");

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            job_id: handle.id,
            status: handle.snapshot().status,
            message: "Generation request submitted".to_string(),
        }),
    ))
}

/// GET /api/v1/jobs/:job_id: current job snapshot.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobView>, ApiError> {
    state.jobs.get(job_id).map(Json).ok_or(ApiError::JobNotFound)
}

/// DELETE /api/v1/jobs/:job_id: stop observing a job.
///
/// Only local polling stops; the upstream job is not cancelled.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.jobs.cancel(job_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::JobNotFound)
    }
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::models::api::ErrorResponse;
use crate::services::catalog::CatalogError;
use crate::services::collector::CollectorError;
use crate::services::credentials::CredentialError;
use crate::services::fal::GenerationError;

pub mod credentials;
pub mod generate;
pub mod health;
pub mod metrics;
pub mod models;
pub mod prompts;

/// Health and `/api/v1` routes. Metrics and middleware are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/models", get(models::list_models))
        .route("/api/v1/models/{slug}", get(models::get_model))
        .route("/api/v1/models/{slug}/generate", post(generate::start_generation))
        .route("/api/v1/prompts", get(prompts::search_prompts))
        .route(
            "/api/v1/credentials",
            get(credentials::get_credentials)
                .put(credentials::set_credentials)
                .delete(credentials::clear_credentials),
        )
        .route(
            "/api/v1/jobs/{job_id}",
            get(generate::get_job).delete(generate::cancel_job),
        )
        .with_state(state)
}

/// Error returned by API handlers, rendered as [`ErrorResponse`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Invalid request: {0}")]
    Validation(#[from] garde::Report),

    #[error("{0}")]
    BadRequest(String),

    #[error("Job not found")]
    JobNotFound,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Catalog(CatalogError::ModelNotFound { .. }) | ApiError::JobNotFound => {
                StatusCode::NOT_FOUND
            }
            ApiError::Credential(CredentialError::Empty) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(_) | ApiError::Credential(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Generation(GenerationError::MissingCredential) => StatusCode::UNAUTHORIZED,
            ApiError::Generation(GenerationError::EmptyPrompt) => StatusCode::BAD_REQUEST,
            ApiError::Generation(GenerationError::Credential(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Generation(_) => StatusCode::BAD_GATEWAY,
            ApiError::Collector(_) | ApiError::Validation(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let suggestion = match &self {
            ApiError::Catalog(CatalogError::ModelNotFound { suggestion, .. }) => suggestion.clone(),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.to_string(),
            credential_required: matches!(
                self,
                ApiError::Generation(GenerationError::MissingCredential)
            ),
            suggestion,
        };
        (status, Json(body)).into_response()
    }
}

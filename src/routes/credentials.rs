use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;

use crate::app_state::AppState;
use crate::models::api::{CredentialStatus, SetCredentialRequest};
use crate::routes::ApiError;
use crate::services::credentials::mask_key;

fn status(state: &AppState) -> Result<CredentialStatus, ApiError> {
    let key = state.credentials.get()?;
    Ok(CredentialStatus {
        configured: key.is_some(),
        masked_key: key.as_deref().map(mask_key),
        saved_at: state.credentials.saved_at()?,
    })
}

/// GET /api/v1/credentials
pub async fn get_credentials(State(state): State<AppState>) -> Result<Json<CredentialStatus>, ApiError> {
    Ok(Json(status(&state)?))
}

/// PUT /api/v1/credentials
pub async fn set_credentials(
    State(state): State<AppState>,
    Json(body): Json<SetCredentialRequest>,
) -> Result<Json<CredentialStatus>, ApiError> {
    body.validate()?;
    state.credentials.set(&body.api_key)?;
    Ok(Json(status(&state)?))
}

/// DELETE /api/v1/credentials
pub async fn clear_credentials(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.credentials.clear()?;
    Ok(StatusCode::NO_CONTENT)
}

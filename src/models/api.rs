use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::generation::JobStatus;

/// Body of `POST /api/v1/models/:slug/generate`.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequestBody {
    #[garde(length(max = 5000))]
    #[serde(default)]
    pub prompt: String,

    #[garde(skip)]
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,

    #[garde(skip)]
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub job_id: uuid::Uuid,
    pub status: JobStatus,
    pub message: String,
}

/// Body of `PUT /api/v1/credentials`.
#[derive(Debug, Deserialize, Validate)]
pub struct SetCredentialRequest {
    #[garde(length(min = 1, max = 512))]
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masked_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub credential_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

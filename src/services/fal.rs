use reqwest::{Client, RequestBuilder, Response};
use std::future::Future;
use std::time::Duration;

use crate::models::generation::{
    GenerationRequest, JobStatus, QueueHandle, StatusResponse, SubmitResponse,
};
use crate::services::credentials::CredentialError;

/// Operations the generation flow needs from a queue API.
///
/// [`FalClient`] talks to fal.ai over HTTP; tests substitute scripted
/// implementations.
pub trait QueueApi: Send + Sync {
    /// POST the request to a model endpoint and return the parsed body.
    fn submit(
        &self,
        endpoint: &str,
        credential: &str,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<SubmitResponse, GenerationError>> + Send;

    /// GET a status URL.
    fn status(
        &self,
        status_url: &str,
        credential: &str,
    ) -> impl Future<Output = Result<StatusResponse, GenerationError>> + Send;

    /// GET a response URL, returning the untyped payload.
    fn result(
        &self,
        response_url: &str,
        credential: &str,
    ) -> impl Future<Output = Result<serde_json::Value, GenerationError>> + Send;
}

/// Client for the fal.ai queue API.
#[derive(Clone)]
pub struct FalClient {
    http: Client,
}

impl FalClient {
    pub fn new() -> Result<Self, GenerationError> {
        let http = Client::builder()
            .user_agent(concat!("vidgen/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self { http })
    }

    fn authorized(&self, builder: RequestBuilder, credential: &str) -> RequestBuilder {
        builder.header(reqwest::header::AUTHORIZATION, format!("Key {credential}"))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, GenerationError> {
        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, body });
        }
        Ok(response)
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, GenerationError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(GenerationError::Parse)
    }
}

impl QueueApi for FalClient {
    async fn submit(
        &self,
        endpoint: &str,
        credential: &str,
        request: &GenerationRequest,
    ) -> Result<SubmitResponse, GenerationError> {
        tracing::debug!(endpoint, "Submitting generation request");
        let builder = self.authorized(self.http.post(endpoint), credential).json(request);
        let response = self.send(builder).await?;
        Self::json(response).await
    }

    async fn status(
        &self,
        status_url: &str,
        credential: &str,
    ) -> Result<StatusResponse, GenerationError> {
        let response = self
            .send(self.authorized(self.http.get(status_url), credential))
            .await?;
        Self::json(response).await
    }

    async fn result(
        &self,
        response_url: &str,
        credential: &str,
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .send(self.authorized(self.http.get(response_url), credential))
            .await?;
        Self::json(response).await
    }
}

/// Turn a submission response into a queue handle.
///
/// Only `IN_QUEUE` is accepted; the queue URLs must be present.
pub fn queue_handle(response: SubmitResponse) -> Result<QueueHandle, GenerationError> {
    if response.status != "IN_QUEUE" {
        return Err(GenerationError::UnexpectedStatus(response.status));
    }

    let status_url = response
        .status_url
        .ok_or(GenerationError::MissingField("status_url"))?;
    let response_url = response
        .response_url
        .ok_or(GenerationError::MissingField("response_url"))?;

    Ok(QueueHandle {
        request_id: response.request_id,
        status_url,
        response_url,
        status: JobStatus::InQueue,
        queue_position: response.queue_position,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("fal.ai API key is required")]
    MissingCredential,

    #[error("A prompt is required")]
    EmptyPrompt,

    #[error("Credential store error: {0}")]
    Credential(#[from] CredentialError),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse API response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected status from submission: {0}")]
    UnexpectedStatus(String),

    #[error("Submission response is missing `{0}`")]
    MissingField(&'static str),

    #[error("Video generation failed: {0}")]
    Failed(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Video generation timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("Generation was cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Whether the failure happened before any network request was made.
    pub fn is_precondition(&self) -> bool {
        matches!(self, GenerationError::MissingCredential | GenerationError::EmptyPrompt)
    }
}

//! Test helpers: a scripted queue API and generator wiring.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vidgen::models::generation::{GenerationRequest, StatusResponse, SubmitResponse};
use vidgen::services::credentials::{CredentialProvider, MemoryCredentials};
use vidgen::services::fal::{GenerationError, QueueApi};
use vidgen::services::generator::Generator;
use vidgen::services::poller::PollSettings;

pub const ENDPOINT: &str = "https://queue.fal.run/fal-ai/test-video";
pub const STATUS_URL: &str = "https://queue.fal.run/fal-ai/test-video/requests/req-1/status";
pub const RESPONSE_URL: &str = "https://queue.fal.run/fal-ai/test-video/requests/req-1";
pub const API_KEY: &str = "test-key:secret";

/// How the scripted queue answers a submission.
#[derive(Debug, Clone)]
pub enum SubmitReply {
    Queued { queue_position: Option<u64> },
    Status(&'static str),
    HttpError(u16, &'static str),
}

/// Queue API that replays a fixed script and counts calls.
///
/// Statuses are consumed in order; the last one repeats forever.
pub struct ScriptedQueue {
    submit: SubmitReply,
    statuses: Mutex<VecDeque<StatusResponse>>,
    result: serde_json::Value,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub result_calls: AtomicUsize,
    pub last_request: Mutex<Option<GenerationRequest>>,
    pub seen_credentials: Mutex<Vec<String>>,
}

pub fn status(name: &str) -> StatusResponse {
    StatusResponse {
        status: name.to_string(),
        queue_position: None,
        error: None,
    }
}

pub fn queued_at(position: u64) -> StatusResponse {
    StatusResponse {
        status: "IN_QUEUE".to_string(),
        queue_position: Some(position),
        error: None,
    }
}

pub fn failed(error: &str) -> StatusResponse {
    StatusResponse {
        status: "FAILED".to_string(),
        queue_position: None,
        error: Some(error.to_string()),
    }
}

impl ScriptedQueue {
    pub fn new(submit: SubmitReply, statuses: Vec<StatusResponse>, result: serde_json::Value) -> Self {
        Self {
            submit,
            statuses: Mutex::new(statuses.into()),
            result,
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            result_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            seen_credentials: Mutex::new(Vec::new()),
        }
    }

    /// Queued at position 5, then the given statuses.
    pub fn queued(statuses: Vec<StatusResponse>, result: serde_json::Value) -> Self {
        Self::new(
            SubmitReply::Queued {
                queue_position: Some(5),
            },
            statuses,
            result,
        )
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn result_fetches(&self) -> usize {
        self.result_calls.load(Ordering::SeqCst)
    }

    pub fn network_calls(&self) -> usize {
        self.submits() + self.polls() + self.result_fetches()
    }

    fn record_credential(&self, credential: &str) {
        self.seen_credentials
            .lock()
            .unwrap()
            .push(credential.to_string());
    }
}

impl QueueApi for ScriptedQueue {
    async fn submit(
        &self,
        endpoint: &str,
        credential: &str,
        request: &GenerationRequest,
    ) -> Result<SubmitResponse, GenerationError> {
        assert_eq!(endpoint, ENDPOINT);
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.record_credential(credential);
        *self.last_request.lock().unwrap() = Some(request.clone());

        match &self.submit {
            SubmitReply::Queued { queue_position } => Ok(SubmitResponse {
                status: "IN_QUEUE".to_string(),
                request_id: Some("req-1".to_string()),
                status_url: Some(STATUS_URL.to_string()),
                response_url: Some(RESPONSE_URL.to_string()),
                queue_position: *queue_position,
            }),
            SubmitReply::Status(status) => Ok(SubmitResponse {
                status: status.to_string(),
                request_id: Some("req-1".to_string()),
                status_url: Some(STATUS_URL.to_string()),
                response_url: Some(RESPONSE_URL.to_string()),
                queue_position: None,
            }),
            SubmitReply::HttpError(code, body) => Err(GenerationError::Api {
                status: *code,
                body: body.to_string(),
            }),
        }
    }

    async fn status(
        &self,
        status_url: &str,
        credential: &str,
    ) -> Result<StatusResponse, GenerationError> {
        assert_eq!(status_url, STATUS_URL);
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        self.record_credential(credential);

        let mut statuses = self.statuses.lock().unwrap();
        let next = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        Ok(next.expect("status script must not be empty"))
    }

    async fn result(
        &self,
        response_url: &str,
        credential: &str,
    ) -> Result<serde_json::Value, GenerationError> {
        assert_eq!(response_url, RESPONSE_URL);
        self.result_calls.fetch_add(1, Ordering::SeqCst);
        self.record_credential(credential);
        Ok(self.result.clone())
    }
}

pub fn credentials_with_key() -> Arc<dyn CredentialProvider> {
    Arc::new(MemoryCredentials::with_key(API_KEY).unwrap())
}

pub fn no_credentials() -> Arc<dyn CredentialProvider> {
    Arc::new(MemoryCredentials::new())
}

pub fn generator(
    queue: Arc<ScriptedQueue>,
    credentials: Arc<dyn CredentialProvider>,
) -> Generator<ScriptedQueue> {
    Generator::new(queue, credentials, PollSettings::default())
}

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::generation::{
    GenerationRequest, GenerationResult, JobSnapshot, JobStatus, QueueHandle,
};
use crate::services::credentials::CredentialProvider;
use crate::services::fal::{queue_handle, GenerationError, QueueApi};
use crate::services::poller::{PollSettings, StatusPoller};
use crate::services::resolver::NO_VIDEO_WARNING;

/// Submission, polling and result resolution for video generation jobs.
pub struct Generator<A: QueueApi> {
    api: Arc<A>,
    credentials: Arc<dyn CredentialProvider>,
    settings: PollSettings,
}

impl<A: QueueApi> Clone for Generator<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            credentials: Arc::clone(&self.credentials),
            settings: self.settings,
        }
    }
}

/// A running job. Dropping the handle does not stop the job.
pub struct JobHandle {
    pub id: Uuid,
    cancel: CancellationToken,
    updates: watch::Receiver<JobSnapshot>,
    task: JoinHandle<Result<GenerationResult, GenerationError>>,
}

impl JobHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.updates.clone()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        self.updates.borrow().clone()
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> Result<GenerationResult, GenerationError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(GenerationError::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

impl<A: QueueApi + 'static> Generator<A> {
    pub fn new(api: Arc<A>, credentials: Arc<dyn CredentialProvider>, settings: PollSettings) -> Self {
        Self {
            api,
            credentials,
            settings,
        }
    }

    /// Check preconditions. Never touches the network.
    ///
    /// Returns the credential to authorize the job with.
    pub fn prepare(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let credential = self
            .credentials
            .get()?
            .filter(|key| !key.trim().is_empty())
            .ok_or(GenerationError::MissingCredential)?;

        if request.prompt.trim().is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }

        Ok(credential)
    }

    /// Submit `request` and return the queue handle.
    pub async fn submit(
        &self,
        endpoint: &str,
        credential: &str,
        request: &GenerationRequest,
    ) -> Result<QueueHandle, GenerationError> {
        let response = self.api.submit(endpoint, credential, request).await?;
        let handle = queue_handle(response)?;
        metrics::counter!("generation_jobs_submitted").increment(1);
        Ok(handle)
    }

    /// Run the whole flow, publishing every state change on `updates`.
    pub async fn run(
        &self,
        endpoint: &str,
        request: &GenerationRequest,
        cancel: CancellationToken,
        updates: &watch::Sender<JobSnapshot>,
    ) -> Result<GenerationResult, GenerationError> {
        let outcome = async {
            let credential = self.prepare(request)?;
            self.execute(endpoint, &credential, request, cancel, updates).await
        }
        .await;
        finish(updates, &outcome);
        outcome
    }

    async fn execute(
        &self,
        endpoint: &str,
        credential: &str,
        request: &GenerationRequest,
        cancel: CancellationToken,
        updates: &watch::Sender<JobSnapshot>,
    ) -> Result<GenerationResult, GenerationError> {
        let submitted_at = Instant::now();
        updates.send_replace(JobSnapshot::submitting());

        let handle = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            handle = self.submit(endpoint, credential, request) => handle?,
        };

        tracing::info!(
            request_id = ?handle.request_id,
            queue_position = ?handle.queue_position,
            "Generation request queued"
        );
        updates.send_modify(|snapshot| {
            snapshot.status = handle.status;
            snapshot.queue_position = handle.queue_position;
            snapshot.updated_at = Utc::now();
        });

        let poller = StatusPoller::new(self.api.as_ref(), credential, self.settings, cancel, updates);
        let result = poller.run(&handle, submitted_at).await?;

        metrics::histogram!("generation_duration_seconds")
            .record(submitted_at.elapsed().as_secs_f64());
        Ok(result)
    }

    /// Check preconditions, then run the flow on a background task.
    pub fn spawn(
        &self,
        endpoint: impl Into<String>,
        request: GenerationRequest,
    ) -> Result<JobHandle, GenerationError> {
        let credential = self.prepare(&request)?;

        let id = Uuid::new_v4();
        let endpoint = endpoint.into();
        let cancel = CancellationToken::new();
        let (tx, rx) = watch::channel(JobSnapshot::submitting());
        let generator = self.clone();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let outcome = generator
                .execute(&endpoint, &credential, &request, token, &tx)
                .await;
            finish(&tx, &outcome);
            match &outcome {
                Ok(result) => tracing::info!(
                    job_id = %id,
                    video_url = ?result.video_url,
                    "Generation completed"
                ),
                Err(GenerationError::Cancelled) => {
                    tracing::info!(job_id = %id, "Generation cancelled")
                }
                Err(e) => tracing::error!(job_id = %id, error = %e, "Generation failed"),
            }
            outcome
        });

        Ok(JobHandle {
            id,
            cancel,
            updates: rx,
            task,
        })
    }
}

/// Write the terminal snapshot and count the outcome.
fn finish(
    updates: &watch::Sender<JobSnapshot>,
    outcome: &Result<GenerationResult, GenerationError>,
) {
    match outcome {
        Ok(result) => {
            metrics::counter!("generation_jobs_completed").increment(1);
            updates.send_modify(|snapshot| {
                snapshot.status = JobStatus::Completed;
                snapshot.video_url = result.video_url.clone();
                if result.video_url.is_none() {
                    snapshot.warning = Some(NO_VIDEO_WARNING.to_string());
                }
                snapshot.updated_at = Utc::now();
            });
        }
        Err(e) => {
            let counter = match e {
                GenerationError::Cancelled => "generation_jobs_cancelled",
                _ => "generation_jobs_failed",
            };
            metrics::counter!(counter).increment(1);
            updates.send_modify(|snapshot| {
                snapshot.status = JobStatus::Failed;
                snapshot.error = Some(e.to_string());
                snapshot.updated_at = Utc::now();
            });
        }
    }
}

//! Queue status polling.
//!
//! After submission the job is observed by GETting its status URL on a
//! fixed interval until it reaches a terminal state, the deadline passes,
//! or the caller cancels. A poll is only scheduled once the previous one
//! resolved, so a single job never has overlapping requests in flight.

use chrono::Utc;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::models::generation::{
    GenerationResult, JobSnapshot, JobStatus, QueueHandle, RemoteStatus,
};
use crate::services::fal::{GenerationError, QueueApi};
use crate::services::resolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Wait before the first status request.
    pub initial_delay: Duration,
    /// Wait between status requests.
    pub interval: Duration,
    /// Deadline measured from submission.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            interval: Duration::from_millis(2000),
            timeout: Duration::from_secs(10 * 60),
        }
    }
}

/// Run `fut` unless `cancel` fires first.
async fn cancellable<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, GenerationError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Drives one queue handle to a terminal state.
pub struct StatusPoller<'a, A: QueueApi> {
    api: &'a A,
    credential: &'a str,
    settings: PollSettings,
    cancel: CancellationToken,
    updates: &'a watch::Sender<JobSnapshot>,
}

impl<'a, A: QueueApi> StatusPoller<'a, A> {
    pub fn new(
        api: &'a A,
        credential: &'a str,
        settings: PollSettings,
        cancel: CancellationToken,
        updates: &'a watch::Sender<JobSnapshot>,
    ) -> Self {
        Self {
            api,
            credential,
            settings,
            cancel,
            updates,
        }
    }

    /// Poll `handle` until it completes, fails, times out or is cancelled.
    ///
    /// `submitted_at` anchors the deadline; time spent before the first
    /// poll counts against it.
    pub async fn run(
        &self,
        handle: &QueueHandle,
        submitted_at: Instant,
    ) -> Result<GenerationResult, GenerationError> {
        cancellable(&self.cancel, sleep(self.settings.initial_delay)).await?;

        loop {
            if submitted_at.elapsed() > self.settings.timeout {
                tracing::warn!(
                    status_url = %handle.status_url,
                    elapsed_secs = submitted_at.elapsed().as_secs(),
                    "Generation timed out"
                );
                return Err(GenerationError::Timeout(self.settings.timeout));
            }

            let status = cancellable(
                &self.cancel,
                self.api.status(&handle.status_url, self.credential),
            )
            .await??;

            match RemoteStatus::parse(&status.status) {
                RemoteStatus::Known(observed @ (JobStatus::InQueue | JobStatus::InProgress)) => {
                    tracing::debug!(
                        status = %observed,
                        queue_position = ?status.queue_position,
                        "Job still running"
                    );
                    self.observe(observed, status.queue_position);
                    cancellable(&self.cancel, sleep(self.settings.interval)).await?;
                }
                RemoteStatus::Known(JobStatus::Completed) => {
                    self.observe(JobStatus::Completed, status.queue_position);
                    let payload = cancellable(
                        &self.cancel,
                        self.api.result(&handle.response_url, self.credential),
                    )
                    .await??;
                    return Ok(resolver::resolve(payload));
                }
                RemoteStatus::Known(JobStatus::Failed) => {
                    let reason = status.error.unwrap_or_else(|| "Unknown error".to_string());
                    return Err(GenerationError::Failed(reason));
                }
                RemoteStatus::Known(JobStatus::Submitting) | RemoteStatus::Unknown(_) => {
                    return Err(GenerationError::UnknownStatus(status.status));
                }
            }
        }
    }

    fn observe(&self, status: JobStatus, queue_position: Option<u64>) {
        self.updates.send_modify(|snapshot| {
            snapshot.status = status;
            if queue_position.is_some() {
                snapshot.queue_position = queue_position;
            }
            snapshot.updated_at = Utc::now();
        });
    }
}

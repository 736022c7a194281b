use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::generation::{GenerationRequest, JobSnapshot};
use crate::services::fal::{GenerationError, QueueApi};
use crate::services::generator::{Generator, JobHandle};

struct JobEntry {
    session: String,
    created_at: DateTime<Utc>,
    cancel: CancellationToken,
    updates: watch::Receiver<JobSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub job_id: Uuid,
    pub session: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: JobSnapshot,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, JobEntry>,
    active: HashMap<String, Uuid>,
}

/// Jobs started through the HTTP API.
///
/// Each session (one per model page) owns at most one active job; starting
/// another cancels the polling of the previous one.
pub struct JobRegistry<A: QueueApi> {
    generator: Generator<A>,
    inner: RwLock<Inner>,
}

impl<A: QueueApi + 'static> JobRegistry<A> {
    pub fn new(generator: Generator<A>) -> Self {
        Self {
            generator,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Start a job in `session`, abandoning whatever that session ran before.
    pub fn start(
        &self,
        session: &str,
        endpoint: &str,
        request: GenerationRequest,
    ) -> Result<JobHandle, GenerationError> {
        let handle = self.generator.spawn(endpoint, request)?;

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = inner.active.insert(session.to_string(), handle.id) {
            if let Some(entry) = inner.jobs.get(&previous) {
                tracing::info!(
                    job_id = %previous,
                    session,
                    "Abandoning previous job for new submission"
                );
                entry.cancel.cancel();
            }
        }
        inner.jobs.insert(
            handle.id,
            JobEntry {
                session: session.to_string(),
                created_at: Utc::now(),
                cancel: handle.cancel_token(),
                updates: handle.subscribe(),
            },
        );
        metrics::gauge!("generation_jobs_tracked").set(inner.jobs.len() as f64);

        Ok(handle)
    }

    pub fn get(&self, id: Uuid) -> Option<JobView> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.jobs.get(&id).map(|entry| JobView {
            job_id: id,
            session: entry.session.clone(),
            created_at: entry.created_at,
            snapshot: entry.updates.borrow().clone(),
        })
    }

    /// Stop polling a job. Returns false for unknown ids.
    pub fn cancel(&self, id: Uuid) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        match inner.jobs.get(&id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Id of the job currently active in `session`.
    pub fn active(&self, session: &str) -> Option<Uuid> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.active.get(session).copied()
    }

    /// Drop finished jobs older than `max_age`.
    pub fn prune(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let before = inner.jobs.len();
        inner
            .jobs
            .retain(|_, entry| entry.created_at > cutoff || !entry.updates.borrow().is_finished());
        let Inner { jobs, active } = &mut *inner;
        active.retain(|_, id| jobs.contains_key(id));
        metrics::gauge!("generation_jobs_tracked").set(inner.jobs.len() as f64);
        before - inner.jobs.len()
    }
}

use std::sync::Arc;

use crate::services::{
    catalog::Catalog,
    credentials::CredentialProvider,
    fal::FalClient,
    generator::Generator,
    jobs::JobRegistry,
    poller::PollSettings,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub jobs: Arc<JobRegistry<FalClient>>,
}

impl AppState {
    pub fn new(
        catalog: Catalog,
        credentials: Arc<dyn CredentialProvider>,
        fal: FalClient,
        settings: PollSettings,
    ) -> Self {
        let generator = Generator::new(Arc::new(fal), Arc::clone(&credentials), settings);
        Self {
            catalog: Arc::new(catalog),
            credentials,
            jobs: Arc::new(JobRegistry::new(generator)),
        }
    }
}

use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use vidgen::app_state::AppState;
use vidgen::config::AppConfig;
use vidgen::routes;
use vidgen::services::{
    catalog::Catalog,
    credentials::{CredentialProvider, FileCredentialStore, MemoryCredentials},
    fal::FalClient,
};

/// How long finished jobs stay queryable.
const JOB_RETENTION_MINUTES: i64 = 60;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing vidgen server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!("generation_jobs_submitted", "Jobs accepted by the queue");
    metrics::describe_counter!("generation_jobs_completed", "Jobs that reached COMPLETED");
    metrics::describe_counter!("generation_jobs_failed", "Jobs that failed or timed out");
    metrics::describe_counter!("generation_jobs_cancelled", "Jobs abandoned locally");
    metrics::describe_histogram!(
        "generation_duration_seconds",
        "Time from submission to a resolved result"
    );
    metrics::describe_gauge!("generation_jobs_tracked", "Jobs held in the registry");

    tracing::info!(data_dir = %config.data_dir.display(), "Loading catalog");
    let catalog = Catalog::load(&config.data_dir).expect("Failed to load catalog");

    let credentials: Arc<dyn CredentialProvider> = match config.fal_key.as_deref() {
        Some(key) => {
            tracing::info!("Using fal.ai API key from environment");
            Arc::new(MemoryCredentials::with_key(key).expect("FAL_KEY is empty"))
        }
        None => {
            tracing::info!(path = %config.credential_path.display(), "Using credential file");
            Arc::new(FileCredentialStore::new(&config.credential_path))
        }
    };

    let fal = FalClient::new().expect("Failed to initialize fal.ai client");

    let state = AppState::new(catalog, credentials, fal, config.poll_settings());

    // Periodically drop finished jobs
    let jobs = Arc::clone(&state.jobs);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            let pruned = jobs.prune(chrono::Duration::minutes(JOB_RETENTION_MINUTES));
            if pruned > 0 {
                tracing::debug!(pruned, "Pruned finished jobs");
            }
        }
    });

    let app = routes::router(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(16 * 1024 * 1024)); // inline reference images

    tracing::info!("Starting vidgen on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}

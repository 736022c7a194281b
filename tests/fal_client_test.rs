//! `FalClient` against a local stand-in for the fal.ai queue API.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use vidgen::models::generation::{GenerationRequest, JobSnapshot, JobStatus, ParamValue};
use vidgen::services::credentials::{CredentialProvider, MemoryCredentials};
use vidgen::services::fal::{queue_handle, FalClient, GenerationError, QueueApi};
use vidgen::services::generator::Generator;
use vidgen::services::poller::PollSettings;

const API_KEY: &str = "key-id:secret";

#[derive(Clone, Default)]
struct Upstream {
    base_url: String,
    authorizations: Arc<Mutex<Vec<String>>>,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl Upstream {
    fn record(&self, headers: &HeaderMap) {
        let value = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.authorizations.lock().unwrap().push(value);
    }
}

async fn submit(State(upstream): State<Upstream>, headers: HeaderMap, body: String) -> Json<Value> {
    upstream.record(&headers);
    upstream.bodies.lock().unwrap().push(body);
    Json(json!({
        "status": "IN_QUEUE",
        "request_id": "req-1",
        "status_url": format!("{}/requests/req-1/status", upstream.base_url),
        "response_url": format!("{}/requests/req-1", upstream.base_url),
        "queue_position": 3
    }))
}

async fn rejected(State(upstream): State<Upstream>, headers: HeaderMap) -> impl IntoResponse {
    upstream.record(&headers);
    (StatusCode::UNAUTHORIZED, "Invalid key")
}

async fn garbled(State(upstream): State<Upstream>, headers: HeaderMap) -> impl IntoResponse {
    upstream.record(&headers);
    (StatusCode::OK, "<html>maintenance</html>")
}

async fn status(State(upstream): State<Upstream>, headers: HeaderMap) -> Json<Value> {
    upstream.record(&headers);
    Json(json!({ "status": "COMPLETED", "queue_position": 0 }))
}

async fn result(State(upstream): State<Upstream>, headers: HeaderMap) -> Json<Value> {
    upstream.record(&headers);
    Json(json!({ "video": { "url": "https://cdn.example/out.mp4" }, "seed": 7 }))
}

/// Serve the stand-in on an ephemeral port and return its state.
async fn start_upstream() -> Upstream {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = Upstream {
        base_url: format!("http://{}", listener.local_addr().unwrap()),
        ..Default::default()
    };

    let app = Router::new()
        .route("/fal-ai/test-video", post(submit))
        .route("/fal-ai/rejected", post(rejected))
        .route("/fal-ai/garbled", post(garbled))
        .route("/requests/req-1/status", get(status))
        .route("/requests/req-1", get(result))
        .with_state(upstream.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    upstream
}

fn request() -> GenerationRequest {
    GenerationRequest::new("A paper boat drifting down a rainy street")
        .with_param("num_inference_steps", ParamValue::Number(30.0))
        .with_param("aspect_ratio", ParamValue::Text("16:9".to_string()))
}

#[tokio::test]
async fn test_submit_sends_key_header_and_flat_body() {
    let upstream = start_upstream().await;
    let client = FalClient::new().unwrap();

    let endpoint = format!("{}/fal-ai/test-video", upstream.base_url);
    let response = client.submit(&endpoint, API_KEY, &request()).await.unwrap();
    let handle = queue_handle(response).unwrap();

    assert_eq!(handle.status, JobStatus::InQueue);
    assert_eq!(handle.request_id.as_deref(), Some("req-1"));
    assert_eq!(handle.queue_position, Some(3));
    assert_eq!(
        handle.status_url,
        format!("{}/requests/req-1/status", upstream.base_url)
    );

    assert_eq!(
        upstream.authorizations.lock().unwrap().as_slice(),
        ["Key key-id:secret"]
    );
    let body: Value = serde_json::from_str(&upstream.bodies.lock().unwrap()[0]).unwrap();
    assert_eq!(
        body,
        json!({
            "prompt": "A paper boat drifting down a rainy street",
            "aspect_ratio": "16:9",
            "num_inference_steps": 30
        })
    );
}

#[tokio::test]
async fn test_error_status_surfaces_body_text() {
    let upstream = start_upstream().await;
    let client = FalClient::new().unwrap();

    let endpoint = format!("{}/fal-ai/rejected", upstream.base_url);
    let err = client.submit(&endpoint, API_KEY, &request()).await.unwrap_err();

    assert!(matches!(err, GenerationError::Api { status: 401, ref body } if body == "Invalid key"));
    assert_eq!(err.to_string(), "API error (401): Invalid key");
}

#[tokio::test]
async fn test_non_json_success_is_a_parse_error() {
    let upstream = start_upstream().await;
    let client = FalClient::new().unwrap();

    let endpoint = format!("{}/fal-ai/garbled", upstream.base_url);
    let err = client.submit(&endpoint, API_KEY, &request()).await.unwrap_err();
    assert!(matches!(err, GenerationError::Parse(_)));
}

#[tokio::test]
async fn test_status_and_result_are_parsed() {
    let upstream = start_upstream().await;
    let client = FalClient::new().unwrap();

    let status = client
        .status(&format!("{}/requests/req-1/status", upstream.base_url), API_KEY)
        .await
        .unwrap();
    assert_eq!(status.status, "COMPLETED");
    assert_eq!(status.queue_position, Some(0));
    assert!(status.error.is_none());

    let payload = client
        .result(&format!("{}/requests/req-1", upstream.base_url), API_KEY)
        .await
        .unwrap();
    assert_eq!(payload["video"]["url"], json!("https://cdn.example/out.mp4"));
}

#[tokio::test]
async fn test_generator_over_http() {
    let upstream = start_upstream().await;
    let credentials: Arc<dyn CredentialProvider> =
        Arc::new(MemoryCredentials::with_key(API_KEY).unwrap());
    let settings = PollSettings {
        initial_delay: Duration::from_millis(10),
        interval: Duration::from_millis(10),
        timeout: Duration::from_secs(10),
    };
    let generator = Generator::new(Arc::new(FalClient::new().unwrap()), credentials, settings);

    let (tx, rx) = tokio::sync::watch::channel(JobSnapshot::submitting());
    let result = generator
        .run(
            &format!("{}/fal-ai/test-video", upstream.base_url),
            &request(),
            CancellationToken::new(),
            &tx,
        )
        .await
        .unwrap();

    assert_eq!(result.video_url.as_deref(), Some("https://cdn.example/out.mp4"));
    assert_eq!(result.payload["seed"], json!(7));
    assert_eq!(rx.borrow().status, JobStatus::Completed);

    // submit, one status poll, one result fetch
    let seen = upstream.authorizations.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert!(seen.iter().all(|h| h == "Key key-id:secret"));
}

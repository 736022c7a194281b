use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub catalog: ComponentHealth,
    pub credentials: ComponentHealth,
}

#[derive(Serialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    fn ok(detail: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            detail: Some(detail.into()),
        }
    }

    fn error(detail: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            detail: Some(detail.into()),
        }
    }
}

/// GET /health: catalog and credential store status.
///
/// A missing key is reported but does not degrade the service; generation
/// requests will ask for one.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = if state.catalog.models().is_empty() {
        ComponentHealth::error("no models loaded")
    } else {
        ComponentHealth::ok(format!(
            "{} models from {}",
            state.catalog.models().len(),
            state.catalog.data_dir().display()
        ))
    };

    let credentials = match state.credentials.get() {
        Ok(Some(_)) => ComponentHealth::ok("configured"),
        Ok(None) => ComponentHealth::ok("not configured"),
        Err(e) => ComponentHealth::error(e.to_string()),
    };

    let all_healthy = catalog.status == "ok" && credentials.status == "ok";
    let status_code = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if all_healthy {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            catalog,
            credentials,
        },
    };

    (status_code, Json(response))
}

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use homequote_backend::BackendClient;
use serde::Serialize;

#[derive(Clone)]
pub struct HealthState {
    backend: Arc<dyn BackendClient>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub backend: HealthCheck,
    pub checked_at: String,
}

pub fn router(backend: Arc<dyn BackendClient>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { backend })
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let backend = backend_check(state.backend.as_ref()).await;
    let ready = backend.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "homequote-server runtime initialized".to_string(),
        },
        backend,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn backend_check(backend: &dyn BackendClient) -> HealthCheck {
    match backend.ping().await {
        Ok(()) => HealthCheck { status: "ready", detail: "booking backend reachable".to_string() },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("booking backend unreachable: {error}"),
        },
    }
}

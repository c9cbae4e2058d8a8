use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use enquiry_agent::AgentRuntime;

#[derive(Clone)]
pub struct HealthState {
    runtime: Arc<AgentRuntime>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
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
    pub registry: HealthCheck,
    pub llm_provider: &'static str,
    pub checked_at: String,
}

pub fn router(runtime: Arc<AgentRuntime>) -> Router {
    Router::new()
        .route("/", get(info))
        .route("/healthz", get(liveness))
        .route("/readyz", get(readiness))
        .with_state(HealthState { runtime })
}

pub async fn info() -> Json<ServiceInfo> {
    Json(ServiceInfo { name: "enquiry-server", version: env!("CARGO_PKG_VERSION") })
}

pub async fn liveness() -> Json<HealthCheck> {
    Json(HealthCheck { status: "ok", detail: "process is running".to_string() })
}

pub async fn readiness(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let registry = registry_check(&state.runtime);
    let ready = registry.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "enquiry-server runtime initialized".to_string(),
        },
        registry,
        llm_provider: state.runtime.llm_name(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn registry_check(runtime: &AgentRuntime) -> HealthCheck {
    match runtime.characters().list() {
        Ok(characters) if !characters.is_empty() => HealthCheck {
            status: "ready",
            detail: format!("{} characters loaded", characters.len()),
        },
        Ok(_) => HealthCheck { status: "degraded", detail: "no characters loaded".to_string() },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("character registry failed: {error}") }
        }
    }
}

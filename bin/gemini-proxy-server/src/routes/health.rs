//! Liveness and readiness probes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use gemini_proxy_core::gemini::Generator;
use serde_json::{json, Map, Value};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health, get_ready))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(get_health))
        .route("/health/ready", get(get_ready))
}

/// Liveness. Always 200 while the process is serving.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is alive", body = Value)
    )
)]
pub async fn get_health() -> Json<Value> {
    Json(json!({
        "status":  "ok",
        "service": "gemini-proxy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness: the database answers and an upstream URL is configured.
#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "health",
    responses(
        (status = 200, description = "Ready to serve traffic", body = Value),
        (status = 503, description = "A dependency is not ready", body = Value),
    )
)]
pub async fn get_ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let mut errors = Map::new();
    if let Err(e) = state.store.ping().await {
        tracing::warn!(error = %e, "readiness: database ping failed");
        errors.insert("database".into(), Value::String(e.to_string()));
    }
    if !state.chat.generator().is_configured() {
        errors.insert("upstream".into(), Value::String("GEMINI_URL is not configured".into()));
    }

    if errors.is_empty() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "errors": errors })),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::routes::test_support::test_state;

    #[tokio::test]
    async fn health_response_has_ok_status() {
        let Json(body) = get_health().await;
        assert_eq!(body["status"], "ok");
        assert!(!body["version"].as_str().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn ready_when_database_and_upstream_are_available() {
        let state = test_state(Some("http://upstream/v1beta/models/m:generateContent".into())).await;
        let (status, Json(body)) = get_ready(State(state)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn not_ready_without_upstream_url() {
        let state = test_state(None).await;
        let (status, Json(body)) = get_ready(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["errors"]["upstream"].is_string());
        assert!(body["errors"].get("database").is_none());
    }
}

//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors become a JSON body
//! `{"error": "..."}` with a matching status code.
//!
//! Store and internal failures are logged with full detail; the caller only
//! sees a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use gemini_proxy_core::CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    /// The upstream model failed or answered with something unusable.
    #[error("bad gateway: {0}")]
    BadGateway(String),

    #[error("gateway timeout: {0}")]
    GatewayTimeout(String),

    /// The upstream endpoint is not configured.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ServerError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Validation(m) => ServerError::BadRequest(m),
            CoreError::NotFound(m) => ServerError::NotFound(m),
            CoreError::Configuration(m) => ServerError::Unavailable(m),
            CoreError::UpstreamTimeout(_) => ServerError::GatewayTimeout(e.to_string()),
            CoreError::UpstreamRejected {
                hint: Some(ref hint),
                ..
            } => ServerError::BadGateway(format!("{e}\n{hint}")),
            CoreError::UpstreamRejected { .. }
            | CoreError::UpstreamUnavailable(_)
            | CoreError::InvalidResponse(_) => ServerError::BadGateway(e.to_string()),
            CoreError::Persistence(db) => ServerError::Database(db),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
            ServerError::BadGateway(m) => {
                warn!(error = %m, "upstream failure");
                (StatusCode::BAD_GATEWAY, m.clone())
            }
            ServerError::GatewayTimeout(m) => {
                warn!(error = %m, "upstream timeout");
                (StatusCode::GATEWAY_TIMEOUT, m.clone())
            }
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http_body_util::BodyExt;

    async fn status_and_body(err: ServerError) -> (StatusCode, serde_json::Value) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn core_errors_map_to_status_classes() {
        let cases = [
            (CoreError::Validation("empty".into()), StatusCode::BAD_REQUEST),
            (CoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (CoreError::Configuration("no url".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CoreError::UpstreamUnavailable("reset".into()), StatusCode::BAD_GATEWAY),
            (CoreError::InvalidResponse("html".into()), StatusCode::BAD_GATEWAY),
            (
                CoreError::UpstreamRejected { status: 500, body: "boom".into(), hint: None },
                StatusCode::BAD_GATEWAY,
            ),
            (CoreError::UpstreamTimeout(30), StatusCode::GATEWAY_TIMEOUT),
            (CoreError::Persistence(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (core, expected) in cases {
            let (status, _) = status_and_body(core.into()).await;
            assert_eq!(status, expected);
        }
    }

    #[tokio::test]
    async fn unauthorized_hint_reaches_the_client() {
        let err: ServerError = CoreError::UpstreamRejected {
            status: 401,
            body: "denied".into(),
            hint: Some("Set GEMINI_API_KEY".into()),
        }
        .into();
        let (status, body) = status_and_body(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let msg = body["error"].as_str().unwrap();
        assert!(msg.contains("401"));
        assert!(msg.contains("Set GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let (status, body) = status_and_body(ServerError::Internal("/etc/secret".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }
}

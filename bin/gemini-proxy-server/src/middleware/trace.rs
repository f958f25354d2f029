//! Per-request trace IDs.
//!
//! Every request runs inside an `http_request` span carrying its trace ID,
//! which is also echoed in the `x-trace-id` response header. Small JSON
//! request bodies are logged; response bodies are passed through untouched
//! so SSE streams reach the client as they are produced.

use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http_body_util::BodyExt;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::error::ServerError;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Request bodies at or above this size are not logged.
const MAX_LOGGED_BODY: usize = 1024;

pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        info!("→ request started");
        let (mut parts, body) = req.into_parts();

        let req_bytes = match buffer_and_log(&parts.headers, body).await {
            Ok(bytes) => bytes,
            Err(e) => return e.into_response(),
        };
        if let Some(value) = trace_header.clone() {
            parts.headers.insert(X_TRACE_ID, value);
        }

        let mut response = next.run(Request::from_parts(parts, Body::from(req_bytes))).await;
        if let Some(value) = trace_header {
            response.headers_mut().insert(X_TRACE_ID, value);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis() as u64,
            "← response started"
        );
        response
    }
    .instrument(span)
    .await
}

async fn buffer_and_log(headers: &HeaderMap, body: Body) -> Result<Bytes, ServerError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let bytes = body
        .collect()
        .await
        .map_err(|e| ServerError::BadRequest(format!("failed to read request body: {e}")))?
        .to_bytes();

    if content_type.contains("application/json") && bytes.len() < MAX_LOGGED_BODY {
        if let Ok(text) = std::str::from_utf8(&bytes) {
            info!(body = %text, "request body");
        }
    } else if !bytes.is_empty() {
        info!(content_type, size = bytes.len(), "request body [skipped]");
    }

    Ok(bytes)
}

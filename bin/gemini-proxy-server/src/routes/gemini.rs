//! Generation routes: one-shot query and SSE stream.

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::StreamExt;
use tracing::debug;
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::extract::ValidatedJson;
use crate::schemas::gemini::{QueryRequest, QueryResponse};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(query, stream),
    components(schemas(QueryRequest, QueryResponse))
)]
pub struct GeminiApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/gemini/query", post(query))
        .route("/gemini/stream", post(stream))
}

/// Send a prompt and wait for the whole reply.
///
/// The prompt and the reply are both stored in the conversation.
#[utoipa::path(
    post,
    path = "/gemini/query",
    tag = "gemini",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Reply generated", body = QueryResponse),
        (status = 400, description = "Invalid prompt"),
        (status = 502, description = "Upstream model failed"),
        (status = 503, description = "Upstream not configured"),
        (status = 504, description = "Upstream timed out"),
    )
)]
pub async fn query(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<QueryRequest>,
) -> Result<Json<QueryResponse>, ServerError> {
    debug!(conversation_id = %req.conversation_id, model = ?req.model, "query request");
    let reply = state.chat.query(req.into()).await?;
    Ok(Json(reply.into()))
}

/// Send a prompt and receive the reply as Server-Sent Events.
///
/// Each event's `data` is one reply fragment encoded as a JSON string. The
/// stream ends when the reply is complete; the full reply is then stored.
#[utoipa::path(
    post,
    path = "/gemini/stream",
    tag = "gemini",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Reply fragments", content_type = "text/event-stream", body = String),
        (status = 400, description = "Invalid prompt"),
        (status = 502, description = "Upstream model failed before any fragment"),
        (status = 503, description = "Upstream not configured"),
    )
)]
pub async fn stream(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<QueryRequest>,
) -> Result<Response, ServerError> {
    debug!(conversation_id = %req.conversation_id, model = ?req.model, "stream request");
    let fragments = state.chat.query_stream(req.into()).await?;
    let events = fragments.map(|fragment| Event::default().json_data(fragment));
    Ok(Sse::new(events).into_response())
}

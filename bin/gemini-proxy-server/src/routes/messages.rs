//! Single-message routes.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use gemini_proxy_core::domain::Role;
use serde_json::{json, Value};
use utoipa::OpenApi;

use crate::error::ServerError;
use crate::extract::ValidatedJson;
use crate::schemas::conversation::{MessageResponse, UpdateMessageRequest};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(get_message, update_message, delete_message),
    components(schemas(MessageResponse, UpdateMessageRequest))
)]
pub struct MessagesApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/messages/{id}",
        get(get_message).put(update_message).delete(delete_message),
    )
}

#[utoipa::path(
    get,
    path = "/messages/{id}",
    tag = "messages",
    params(("id" = String, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message", body = MessageResponse),
        (status = 404, description = "No such message"),
    )
)]
pub async fn get_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    Ok(Json(state.conversations.get_message(&id).await?.into()))
}

#[utoipa::path(
    put,
    path = "/messages/{id}",
    tag = "messages",
    params(("id" = String, Path, description = "Message id")),
    request_body = UpdateMessageRequest,
    responses(
        (status = 200, description = "Message updated", body = MessageResponse),
        (status = 400, description = "Bad content or role"),
        (status = 404, description = "No such message"),
    )
)]
pub async fn update_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateMessageRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    let role = Role::from_str(req.role.trim())
        .map_err(|_| ServerError::BadRequest(format!("unknown role '{}'", req.role)))?;
    let updated = state
        .conversations
        .update_message(&id, role, &req.content)
        .await?;
    Ok(Json(updated.into()))
}

#[utoipa::path(
    delete,
    path = "/messages/{id}",
    tag = "messages",
    params(("id" = String, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message deleted", body = Value),
        (status = 404, description = "No such message"),
    )
)]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ServerError> {
    state.conversations.delete_message(&id).await?;
    Ok(Json(json!({ "deleted": true })))
}
